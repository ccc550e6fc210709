use super::types::KbFuzzError;

#[derive(Debug, Clone)]
pub struct ErrorClassification {
    pub error_type: &'static str,
    /// A stage-fatal error prevents the affected stage from starting or
    /// persisting its report. Everything else is recorded per test.
    pub stage_fatal: bool,
}

impl KbFuzzError {
    /// Classify this error to determine its type and whether it stops a stage.
    pub fn classify(&self) -> ErrorClassification {
        match self {
            // Stage-fatal errors
            KbFuzzError::Config(_) | KbFuzzError::Yaml(_) => ErrorClassification {
                error_type: "ConfigurationError",
                stage_fatal: true,
            },
            KbFuzzError::Io(_) => ErrorClassification {
                error_type: "IoError",
                stage_fatal: true,
            },

            // Recorded as outcomes, never fatal
            KbFuzzError::Http(e) if e.is_timeout() => ErrorClassification {
                error_type: "TimeoutError",
                stage_fatal: false,
            },
            KbFuzzError::Http(_) => ErrorClassification {
                error_type: "TransportError",
                stage_fatal: false,
            },
            KbFuzzError::Corpus(_) | KbFuzzError::Zip(_) => ErrorClassification {
                error_type: "CorpusError",
                stage_fatal: false,
            },
            KbFuzzError::Json(_) => ErrorClassification {
                error_type: "ParseError",
                stage_fatal: false,
            },
            KbFuzzError::Internal(_) => ErrorClassification {
                error_type: "InternalError",
                stage_fatal: false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_is_stage_fatal() {
        let err = KbFuzzError::Config("missing dataset id".into());
        let class = err.classify();
        assert_eq!(class.error_type, "ConfigurationError");
        assert!(class.stage_fatal);
    }

    #[test]
    fn test_per_test_errors_are_not_fatal() {
        for err in [
            KbFuzzError::Internal("task panicked".into()),
            KbFuzzError::Corpus("bad pattern".into()),
        ] {
            assert!(!err.classify().stage_fatal, "{} should not be stage-fatal", err);
        }
    }

    #[test]
    fn test_io_error_classification() {
        let err: KbFuzzError = std::io::Error::new(std::io::ErrorKind::Other, "disk full").into();
        assert_eq!(err.classify().error_type, "IoError");
        assert!(err.classify().stage_fatal);
    }

    #[test]
    fn test_zip_error_is_corpus_error() {
        let err: KbFuzzError = zip::result::ZipError::FileNotFound.into();
        assert_eq!(err.classify().error_type, "CorpusError");
        assert!(!err.classify().stage_fatal);
    }
}
