use serde_json::{json, Value};
use std::sync::LazyLock;

pub static CONFIG_SCHEMA: LazyLock<Value> = LazyLock::new(|| {
    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "type": "object",
        "additionalProperties": false,
        "properties": {
            "target": {
                "type": "object",
                "properties": {
                    "base_url": { "type": "string" },
                    "token": { "type": "string" },
                    "resource_id": { "type": "string" },
                    "api_prefix": { "type": "string" },
                    "workspace": { "type": "string" }
                }
            },
            "execution": {
                "type": "object",
                "properties": {
                    "request_timeout_secs": { "type": "integer", "minimum": 1 },
                    "upload_timeout_secs": { "type": "integer", "minimum": 1 },
                    "probe_timeout_secs": { "type": "integer", "minimum": 1 },
                    "slow_threshold_secs": { "type": "number", "exclusiveMinimum": 0 },
                    "pacing_ms": { "type": "integer", "minimum": 0 },
                    "upload_pacing_ms": { "type": "integer", "minimum": 0 },
                    "max_concurrency": { "type": "integer", "minimum": 1 }
                }
            },
            "property": {
                "type": "object",
                "properties": {
                    "seed": { "type": "integer", "minimum": 0 },
                    "shrink": { "type": "boolean" },
                    "max_shrink_attempts": { "type": "integer", "minimum": 1 },
                    "trials": {
                        "type": "object",
                        "properties": {
                            "create_knowledge": { "type": "integer", "minimum": 0 },
                            "search_knowledge": { "type": "integer", "minimum": 0 },
                            "random_endpoint": { "type": "integer", "minimum": 0 },
                            "malformed_json": { "type": "integer", "minimum": 0 }
                        }
                    }
                }
            },
            "discovery": {
                "type": "object",
                "properties": {
                    "upload_candidates": {
                        "type": "array",
                        "items": { "type": "string" },
                        "minItems": 1
                    }
                }
            },
            "output": {
                "type": "object",
                "properties": {
                    "results_dir": { "type": "string" },
                    "corpus_dir": { "type": "string" },
                    "oversized_mb": { "type": "integer", "minimum": 1 }
                }
            }
        }
    })
});
