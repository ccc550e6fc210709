use std::path::Path;
use crate::errors::KbFuzzError;
use super::credentials::resolve_credential;
use super::types::KbFuzzConfig;
use super::schema::CONFIG_SCHEMA;
use tracing::warn;

const MAX_CONFIG_BYTES: u64 = 1_048_576;

pub async fn parse_config(path: &Path) -> Result<KbFuzzConfig, KbFuzzError> {
    let content = read_config_file(path).await?;
    parse_config_str(&content)
}

/// Like [`parse_config`], also returning the advisory schema warnings.
pub async fn check_config(path: &Path) -> Result<(KbFuzzConfig, Vec<String>), KbFuzzError> {
    let content = read_config_file(path).await?;
    parse_config_str_checked(&content)
}

async fn read_config_file(path: &Path) -> Result<String, KbFuzzError> {
    if !path.exists() {
        return Err(KbFuzzError::Config(format!("Config file not found: {}", path.display())));
    }

    let metadata = tokio::fs::metadata(path).await?;
    if metadata.len() > MAX_CONFIG_BYTES {
        return Err(KbFuzzError::Config("Config file exceeds 1MB limit".into()));
    }

    Ok(tokio::fs::read_to_string(path).await?)
}

/// Parse, validate and resolve a config document already in memory.
pub fn parse_config_str(content: &str) -> Result<KbFuzzConfig, KbFuzzError> {
    parse_config_str_checked(content).map(|(config, _)| config)
}

pub fn parse_config_str_checked(content: &str) -> Result<(KbFuzzConfig, Vec<String>), KbFuzzError> {
    let yaml: serde_yaml::Value = serde_yaml::from_str(content)?;
    if yaml.is_null() {
        return Ok((KbFuzzConfig::default(), Vec::new()));
    }

    let warnings = validate_schema(&yaml)?;

    let mut config: KbFuzzConfig = serde_yaml::from_value(yaml)?;

    validate_conflicts(&config)?;

    if let Some(target) = config.target.as_mut() {
        target.token = target.token.as_deref().map(resolve_credential);
    }

    Ok((config, warnings))
}

/// Advisory structural check: violations are logged, never fatal.
/// Returns the collected messages for `kbfuzz validate` to print.
pub fn validate_schema(yaml: &serde_yaml::Value) -> Result<Vec<String>, KbFuzzError> {
    let json_value = serde_json::to_value(yaml)
        .map_err(|e| KbFuzzError::Config(format!("Config conversion error: {}", e)))?;

    let compiled = jsonschema::JSONSchema::compile(&CONFIG_SCHEMA)
        .map_err(|e| KbFuzzError::Config(format!("Schema compilation error: {}", e)))?;

    let mut messages = Vec::new();
    if let Err(errors) = compiled.validate(&json_value) {
        for e in errors {
            let msg = format!("{} at {}", e, e.instance_path);
            warn!(validation_error = %msg, "Config schema warning");
            messages.push(msg);
        }
    }

    Ok(messages)
}

/// Detect semantic conflicts in the parsed configuration.
fn validate_conflicts(config: &KbFuzzConfig) -> Result<(), KbFuzzError> {
    if let Some(base_url) = config.target.as_ref().and_then(|t| t.base_url.as_deref()) {
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(KbFuzzError::Config(format!(
                "base_url must be an http(s) URL, got '{}'",
                base_url
            )));
        }
    }

    if let Some(execution) = &config.execution {
        if execution.max_concurrency == Some(0) {
            return Err(KbFuzzError::Config("max_concurrency must be at least 1".into()));
        }
        if let Some(slow) = execution.slow_threshold_secs {
            if !slow.is_finite() || slow <= 0.0 {
                return Err(KbFuzzError::Config("slow_threshold_secs must be a positive, finite number".into()));
            }
            if let Some(upload) = execution.upload_timeout_secs {
                if slow > upload as f64 {
                    warn!(
                        slow_threshold_secs = slow,
                        upload_timeout_secs = upload,
                        "Slow threshold exceeds upload timeout; slow uploads will surface as timeouts only"
                    );
                }
            }
        }
    }

    if config.output.as_ref().and_then(|o| o.oversized_mb) == Some(0) {
        return Err(KbFuzzError::Config("oversized_mb must be at least 1".into()));
    }

    if let Some(candidates) = config.discovery.as_ref().and_then(|d| d.upload_candidates.as_ref()) {
        if candidates.is_empty() {
            return Err(KbFuzzError::Config("upload_candidates must not be empty".into()));
        }
        for candidate in candidates {
            if !candidate.starts_with('/') {
                return Err(KbFuzzError::Config(format!(
                    "upload candidate '{}' must start with '/'",
                    candidate
                )));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DiscoveryConfig, ExecutionConfig, TargetSection};

    #[test]
    fn test_validate_conflicts_empty_config() {
        let config = KbFuzzConfig::default();
        assert!(validate_conflicts(&config).is_ok());
    }

    #[test]
    fn test_validate_conflicts_zero_concurrency() {
        let config = KbFuzzConfig {
            execution: Some(ExecutionConfig {
                max_concurrency: Some(0),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(validate_conflicts(&config).is_err());
    }

    #[test]
    fn test_non_finite_slow_threshold_is_rejected() {
        for value in [".inf", "-.inf", ".nan"] {
            let doc = format!("execution:\n  slow_threshold_secs: {}\n", value);
            assert!(matches!(parse_config_str(&doc), Err(KbFuzzError::Config(_))), "{} accepted", value);
        }
    }

    #[test]
    fn test_zero_oversized_size_is_rejected() {
        let err = parse_config_str("output:\n  oversized_mb: 0\n").unwrap_err();
        assert!(matches!(err, KbFuzzError::Config(_)));
    }

    #[test]
    fn test_validate_conflicts_bad_scheme() {
        let config = KbFuzzConfig {
            target: Some(TargetSection {
                base_url: Some("ftp://kb.local".into()),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(validate_conflicts(&config).is_err());
    }

    #[test]
    fn test_validate_conflicts_relative_candidate() {
        let config = KbFuzzConfig {
            discovery: Some(DiscoveryConfig {
                upload_candidates: Some(vec!["dataset/{resource_id}/document".into()]),
            }),
            ..Default::default()
        };
        assert!(validate_conflicts(&config).is_err());
    }

    #[test]
    fn test_parse_config_str_resolves_env_token() {
        std::env::set_var("TEST_KBFUZZ_PARSER_TOKEN", "Bearer from-env");
        let config = parse_config_str("target:\n  token: $TEST_KBFUZZ_PARSER_TOKEN\n").unwrap();
        assert_eq!(
            config.target.unwrap().token.as_deref(),
            Some("Bearer from-env")
        );
        std::env::remove_var("TEST_KBFUZZ_PARSER_TOKEN");
    }

    #[test]
    fn test_parse_config_str_empty_document() {
        let config = parse_config_str("").unwrap();
        assert!(config.target.is_none());
    }

    #[test]
    fn test_schema_warnings_are_advisory() {
        let yaml: serde_yaml::Value =
            serde_yaml::from_str("execution:\n  pacing_ms: fast\n").unwrap();
        let messages = validate_schema(&yaml).unwrap();
        assert!(!messages.is_empty());
    }

    #[test]
    fn test_checked_parse_keeps_schema_warnings() {
        let (config, warnings) = parse_config_str_checked("extra: 1\nproperty:\n  max_shrink_attempts: 0\n").unwrap();
        assert_eq!(warnings.len(), 2);
        assert!(warnings.iter().any(|w| w.contains("extra")));
        assert_eq!(config.property.unwrap().max_shrink_attempts, Some(0));
    }

    #[tokio::test]
    async fn test_parse_config_missing_file() {
        let result = parse_config(Path::new("/nonexistent/kbfuzz.yaml")).await;
        assert!(matches!(result, Err(KbFuzzError::Config(_))));
    }

    #[tokio::test]
    async fn test_parse_config_rejects_oversized_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.yaml");
        std::fs::write(&path, "#".repeat(1_048_577)).unwrap();
        let result = parse_config(&path).await;
        assert!(matches!(result, Err(KbFuzzError::Config(_))));
    }
}
