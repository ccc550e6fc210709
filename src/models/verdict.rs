use serde::{Deserialize, Serialize};

/// Failure class a test outcome falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BugType {
    /// Application-level fault code or HTTP status >= 500.
    ServerError,
    /// Hard timeout, or a response slower than the slow threshold.
    Timeout,
    /// Transport failure: connection refused, reset, or similar.
    #[serde(alias = "CRASH")]
    ConnectionError,
    /// Anything else, including expected rejections.
    None,
}

impl BugType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ServerError => "SERVER_ERROR",
            Self::Timeout => "TIMEOUT",
            Self::ConnectionError => "CONNECTION_ERROR",
            Self::None => "NONE",
        }
    }
}

impl std::fmt::Display for BugType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifier output for one raw result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub is_bug: bool,
    pub bug_type: BugType,
}

impl Verdict {
    pub const NO_BUG: Verdict = Verdict { is_bug: false, bug_type: BugType::None };

    pub fn bug(bug_type: BugType) -> Self {
        Self { is_bug: true, bug_type }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crash_alias_deserializes_to_connection_error() {
        let parsed: BugType = serde_json::from_str("\"CRASH\"").unwrap();
        assert_eq!(parsed, BugType::ConnectionError);
        assert_eq!(serde_json::to_string(&parsed).unwrap(), "\"CONNECTION_ERROR\"");
    }

    #[test]
    fn test_verdict_constructors() {
        assert!(!Verdict::NO_BUG.is_bug);
        assert_eq!(Verdict::bug(BugType::Timeout), Verdict { is_bug: true, bug_type: BugType::Timeout });
    }
}
