use std::time::Duration;

use crate::models::{BugType, Verdict};
use super::transport::RawResult;

/// Envelope code the target uses for "not found".
pub const NOT_FOUND_CODE: i64 = 404;
/// Envelope code the target uses for "unauthenticated".
pub const UNAUTHORIZED_CODE: i64 = 401;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassifierConfig {
    /// Envelope code the target uses to signal an internal fault.
    pub server_fault_code: i64,
    /// Only set for long-running operations such as uploads.
    pub slow_threshold: Option<Duration>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self { server_fault_code: 500, slow_threshold: None }
    }
}

impl ClassifierConfig {
    pub fn with_slow_threshold(mut self, threshold: Duration) -> Self {
        self.slow_threshold = Some(threshold);
        self
    }
}

/// Map a raw result onto the bug taxonomy. First matching rule wins.
pub fn classify(raw: &RawResult, config: &ClassifierConfig) -> Verdict {
    match raw {
        RawResult::TransportFailure { .. } => Verdict::bug(BugType::ConnectionError),
        RawResult::TimedOut { .. } => Verdict::bug(BugType::Timeout),
        RawResult::Response { status, latency, .. } => {
            if raw.api_code() == Some(config.server_fault_code) || *status >= 500 {
                return Verdict::bug(BugType::ServerError);
            }
            match config.slow_threshold {
                Some(threshold) if *latency > threshold => Verdict::bug(BugType::Timeout),
                _ => Verdict::NO_BUG,
            }
        }
    }
}

/// The target rejected the request as unauthenticated. Informational only.
pub fn is_auth_blocked(raw: &RawResult) -> bool {
    raw.api_code() == Some(UNAUTHORIZED_CODE) || raw.status() == Some(401)
}
