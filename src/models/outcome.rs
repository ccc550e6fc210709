use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use super::category::Category;
use super::payload::{HttpMethod, Payload};
use super::verdict::BugType;
use crate::utils::truncation::truncate_error;

/// Sentinels stored in place of an HTTP status when no response arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusSentinel {
    Timeout,
    ConnectionError,
}

/// HTTP status as recorded in the ledger: a real code or a sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HttpStatus {
    Code(u16),
    Sentinel(StatusSentinel),
}

impl std::fmt::Display for HttpStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HttpStatus::Code(code) => write!(f, "{}", code),
            HttpStatus::Sentinel(StatusSentinel::Timeout) => f.write_str("TIMEOUT"),
            HttpStatus::Sentinel(StatusSentinel::ConnectionError) => f.write_str("CONNECTION_ERROR"),
        }
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Result of one executed test. Created once, appended to the ledger, never
/// edited afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutcomeRecord {
    pub test_name: String,
    pub category: Category,
    pub method: HttpMethod,
    pub url: String,
    pub payload_preview: Option<String>,
    /// `None` only when the request could not be issued at all.
    pub http_status: Option<HttpStatus>,
    pub response_time_ms: u64,
    /// Envelope `code` when the body parsed as JSON.
    pub api_code: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_preview: Option<String>,
    pub is_bug: bool,
    pub bug_type: BugType,
    #[serde(default, skip_serializing_if = "is_false")]
    pub auth_blocked: bool,
    /// Transport-level error text, truncated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Set when the harness itself failed to execute the payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_error: Option<String>,
    /// Property name for property-trial records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl OutcomeRecord {
    /// Histogram key: application code if present, else the transport
    /// status, else `UNKNOWN`.
    pub fn effective_status(&self) -> String {
        match (self.api_code, self.http_status) {
            (Some(code), _) => code.to_string(),
            (None, Some(status)) => status.to_string(),
            (None, None) => "UNKNOWN".to_string(),
        }
    }

    /// Record for a payload the harness could not execute at all. Carries no
    /// status and is not a bug of the target.
    pub fn execution_failure(payload: &Payload, url: String, error: &str) -> Self {
        Self {
            test_name: payload.test_name.clone(),
            category: payload.category,
            method: payload.method,
            url,
            payload_preview: payload.preview(),
            http_status: None,
            response_time_ms: 0,
            api_code: None,
            api_message: None,
            response_preview: None,
            is_bug: false,
            bug_type: BugType::None,
            auth_blocked: false,
            error: None,
            execution_error: Some(truncate_error(error)),
            property: None,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
pub(crate) fn sample_record(test_name: &str, category: Category, status: Option<HttpStatus>, api_code: Option<i64>, bug_type: BugType) -> OutcomeRecord {
    OutcomeRecord {
        test_name: test_name.to_string(),
        category,
        method: HttpMethod::Get,
        url: "http://localhost:8080/admin/api/user/profile".to_string(),
        payload_preview: None,
        http_status: status,
        response_time_ms: 12,
        api_code,
        api_message: None,
        response_preview: None,
        is_bug: bug_type != BugType::None,
        bug_type,
        auth_blocked: false,
        error: None,
        execution_error: None,
        property: None,
        timestamp: Utc::now(),
    }
}
