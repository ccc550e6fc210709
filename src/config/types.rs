use serde::{Deserialize, Serialize};

/// On-disk configuration. Every field is optional; CLI flags override and
/// built-in defaults fill the rest.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct KbFuzzConfig {
    pub target: Option<TargetSection>,
    pub execution: Option<ExecutionConfig>,
    pub property: Option<PropertyConfig>,
    pub discovery: Option<DiscoveryConfig>,
    pub output: Option<OutputConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct TargetSection {
    pub base_url: Option<String>,
    /// Literal credential or `$ENV_VAR` reference.
    pub token: Option<String>,
    pub resource_id: Option<String>,
    pub api_prefix: Option<String>,
    pub workspace: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ExecutionConfig {
    pub request_timeout_secs: Option<u64>,
    pub upload_timeout_secs: Option<u64>,
    pub probe_timeout_secs: Option<u64>,
    pub slow_threshold_secs: Option<f64>,
    pub pacing_ms: Option<u64>,
    pub upload_pacing_ms: Option<u64>,
    pub max_concurrency: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct PropertyConfig {
    pub seed: Option<u64>,
    pub trials: Option<TrialCountsConfig>,
    pub shrink: Option<bool>,
    pub max_shrink_attempts: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct TrialCountsConfig {
    pub create_knowledge: Option<usize>,
    pub search_knowledge: Option<usize>,
    pub random_endpoint: Option<usize>,
    pub malformed_json: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct DiscoveryConfig {
    /// Upload path templates; `{resource_id}` is expanded.
    pub upload_candidates: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct OutputConfig {
    pub results_dir: Option<String>,
    pub corpus_dir: Option<String>,
    pub oversized_mb: Option<u64>,
}

/// Which stages a run executes.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StageSelector {
    File,
    Api,
    Property,
    #[default]
    All,
}

impl StageSelector {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Api => "api",
            Self::Property => "property",
            Self::All => "all",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "file" => Some(Self::File),
            "api" => Some(Self::Api),
            "property" | "hypothesis" => Some(Self::Property),
            "all" => Some(Self::All),
            _ => None,
        }
    }

    pub fn includes_file(&self) -> bool {
        matches!(self, Self::File | Self::All)
    }

    pub fn includes_api(&self) -> bool {
        matches!(self, Self::Api | Self::All)
    }

    pub fn includes_property(&self) -> bool {
        matches!(self, Self::Property | Self::All)
    }
}

impl std::fmt::Display for StageSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_parse() {
        assert_eq!(StageSelector::parse("file"), Some(StageSelector::File));
        assert_eq!(StageSelector::parse("hypothesis"), Some(StageSelector::Property));
        assert_eq!(StageSelector::parse("everything"), None);
    }

    #[test]
    fn test_selector_all_includes_every_stage() {
        let all = StageSelector::All;
        assert!(all.includes_file() && all.includes_api() && all.includes_property());
        assert!(!StageSelector::Api.includes_file());
        assert!(!StageSelector::File.includes_property());
    }

    #[test]
    fn test_config_default_is_empty() {
        let config = KbFuzzConfig::default();
        assert!(config.target.is_none());
        assert!(config.execution.is_none());
        assert!(config.property.is_none());
    }

    #[test]
    fn test_config_deserializes_nested_sections() {
        let yaml = "target:\n  base_url: http://kb.local:8080\n  resource_id: ds-1\nexecution:\n  pacing_ms: 50\n  max_concurrency: 4\nproperty:\n  seed: 7\n  trials:\n    create_knowledge: 5\n";
        let config: KbFuzzConfig = serde_yaml::from_str(yaml).unwrap();
        let target = config.target.unwrap();
        assert_eq!(target.base_url.as_deref(), Some("http://kb.local:8080"));
        assert_eq!(config.execution.unwrap().max_concurrency, Some(4));
        let property = config.property.unwrap();
        assert_eq!(property.seed, Some(7));
        assert_eq!(property.trials.unwrap().create_knowledge, Some(5));
    }

    #[test]
    fn test_selector_serialization_roundtrip() {
        let json = serde_json::to_string(&StageSelector::Property).unwrap();
        assert_eq!(json, "\"property\"");
    }
}
