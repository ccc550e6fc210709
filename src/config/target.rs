use std::path::PathBuf;
use std::time::Duration;

use crate::errors::KbFuzzError;
use crate::probe::layout::ApiLayout;
use super::types::KbFuzzConfig;

/// Trial counts per declared property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrialCounts {
    pub create_knowledge: usize,
    pub search_knowledge: usize,
    pub random_endpoint: usize,
    pub malformed_json: usize,
}

impl Default for TrialCounts {
    fn default() -> Self {
        Self {
            create_knowledge: 50,
            search_knowledge: 30,
            random_endpoint: 30,
            malformed_json: 30,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PropertySettings {
    /// Fixed seed for replay; drawn once per run when absent.
    pub seed: Option<u64>,
    pub trials: TrialCounts,
    pub shrink: bool,
    pub max_shrink_attempts: usize,
}

impl Default for PropertySettings {
    fn default() -> Self {
        Self {
            seed: None,
            trials: TrialCounts::default(),
            shrink: false,
            max_shrink_attempts: 32,
        }
    }
}

/// Immutable run configuration, built once at startup.
#[derive(Debug, Clone)]
pub struct TargetConfig {
    pub base_url: String,
    pub token: Option<String>,
    pub resource_id: Option<String>,
    pub results_dir: PathBuf,
    pub corpus_dir: PathBuf,
    pub layout: ApiLayout,
    pub request_timeout: Duration,
    pub upload_timeout: Duration,
    pub probe_timeout: Duration,
    /// Latency above which an upload is classified as TIMEOUT.
    pub slow_threshold: Duration,
    pub pacing: Duration,
    pub upload_pacing: Duration,
    pub max_concurrency: usize,
    pub oversized_bytes: usize,
    pub upload_candidates: Option<Vec<String>>,
    pub property: PropertySettings,
}

impl TargetConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
            resource_id: None,
            results_dir: PathBuf::from("results"),
            corpus_dir: PathBuf::from("malformed_files"),
            layout: ApiLayout::default(),
            request_timeout: Duration::from_secs(30),
            upload_timeout: Duration::from_secs(60),
            probe_timeout: Duration::from_secs(10),
            slow_threshold: Duration::from_secs(30),
            pacing: Duration::from_millis(300),
            upload_pacing: Duration::from_secs(1),
            max_concurrency: 1,
            oversized_bytes: 5 * 1024 * 1024,
            upload_candidates: None,
            property: PropertySettings::default(),
        }
    }

    /// Layer a parsed config file over the defaults. `base_url` wins over
    /// the file's own target URL when given.
    pub fn from_config(config: &KbFuzzConfig, base_url: Option<&str>) -> Result<Self, KbFuzzError> {
        let target = config.target.clone().unwrap_or_default();
        let url = base_url
            .map(str::to_string)
            .or(target.base_url)
            .ok_or_else(|| KbFuzzError::Config("a base URL (--base-url) is required".into()))?;

        let mut resolved = Self::new(&url);
        resolved.token = target.token;
        resolved.resource_id = target.resource_id;
        if let Some(prefix) = target.api_prefix {
            resolved.layout.api_prefix = prefix.trim_end_matches('/').to_string();
        }
        if let Some(workspace) = target.workspace {
            resolved.layout.workspace = workspace;
        }

        if let Some(execution) = &config.execution {
            if let Some(secs) = execution.request_timeout_secs {
                resolved.request_timeout = Duration::from_secs(secs);
            }
            if let Some(secs) = execution.upload_timeout_secs {
                resolved.upload_timeout = Duration::from_secs(secs);
            }
            if let Some(secs) = execution.probe_timeout_secs {
                resolved.probe_timeout = Duration::from_secs(secs);
            }
            if let Some(secs) = execution.slow_threshold_secs {
                resolved.slow_threshold = slow_threshold_from_secs(secs)?;
            }
            if let Some(ms) = execution.pacing_ms {
                resolved.pacing = Duration::from_millis(ms);
            }
            if let Some(ms) = execution.upload_pacing_ms {
                resolved.upload_pacing = Duration::from_millis(ms);
            }
            if let Some(n) = execution.max_concurrency {
                resolved.max_concurrency = n.max(1);
            }
        }

        if let Some(property) = &config.property {
            resolved.property.seed = property.seed;
            if let Some(shrink) = property.shrink {
                resolved.property.shrink = shrink;
            }
            if let Some(n) = property.max_shrink_attempts {
                resolved.property.max_shrink_attempts = n;
            }
            if let Some(trials) = &property.trials {
                let counts = &mut resolved.property.trials;
                counts.create_knowledge = trials.create_knowledge.unwrap_or(counts.create_knowledge);
                counts.search_knowledge = trials.search_knowledge.unwrap_or(counts.search_knowledge);
                counts.random_endpoint = trials.random_endpoint.unwrap_or(counts.random_endpoint);
                counts.malformed_json = trials.malformed_json.unwrap_or(counts.malformed_json);
            }
        }

        if let Some(discovery) = &config.discovery {
            resolved.upload_candidates = discovery.upload_candidates.clone();
        }

        if let Some(output) = &config.output {
            if let Some(dir) = &output.results_dir {
                resolved.results_dir = PathBuf::from(dir);
            }
            if let Some(dir) = &output.corpus_dir {
                resolved.corpus_dir = PathBuf::from(dir);
            }
            if let Some(mb) = output.oversized_mb {
                resolved.oversized_bytes = oversized_bytes_from_mb(mb)?;
            }
        }

        Ok(resolved)
    }

    pub fn require_token(&self) -> Result<&str, KbFuzzError> {
        self.token.as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| KbFuzzError::Config("an auth credential (--token) is required".into()))
    }

    pub fn require_resource_id(&self) -> Result<&str, KbFuzzError> {
        self.resource_id.as_deref()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| KbFuzzError::Config("a resource id (--dataset-id) is required".into()))
    }
}

/// Positive, finite seconds only; `Duration::from_secs_f64` panics otherwise.
pub fn slow_threshold_from_secs(secs: f64) -> Result<Duration, KbFuzzError> {
    if !secs.is_finite() || secs <= 0.0 {
        return Err(KbFuzzError::Config(format!(
            "slow threshold must be a positive number of seconds, got {}",
            secs
        )));
    }
    Duration::try_from_secs_f64(secs)
        .map_err(|e| KbFuzzError::Config(format!("slow threshold {} out of range: {}", secs, e)))
}

/// Oversized-variant body size in bytes. At least 1 MiB.
pub fn oversized_bytes_from_mb(mb: u64) -> Result<usize, KbFuzzError> {
    if mb == 0 {
        return Err(KbFuzzError::Config("oversized size must be at least 1 MiB".into()));
    }
    usize::try_from(mb)
        .ok()
        .and_then(|mb| mb.checked_mul(1024 * 1024))
        .ok_or_else(|| KbFuzzError::Config(format!("oversized size of {} MiB is too large", mb)))
}
