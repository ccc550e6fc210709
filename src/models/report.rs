use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use super::outcome::OutcomeRecord;
use super::verdict::BugType;
use crate::pipeline::state::Stage;

/// Persisted report for one stage.
///
/// Schema notes: every map in `summary` is a `BTreeMap`, so keys are emitted
/// in ascending key order. `bugs` and `all_results` keep ledger order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignReport {
    pub meta: ReportMeta,
    pub summary: ReportSummary,
    pub bugs: Vec<OutcomeRecord>,
    pub all_results: Vec<OutcomeRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub minimized: Vec<MinimizedCase>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMeta {
    pub target: String,
    pub resource_id: Option<String>,
    pub stage: Stage,
    pub timestamp: DateTime<Utc>,
    pub total_tests: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    #[serde(default)]
    pub interrupted: bool,
    pub tool_version: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryStats {
    pub total: usize,
    pub bugs: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total: usize,
    pub bugs_found: usize,
    pub by_category: BTreeMap<String, CategoryStats>,
    pub by_bug_type: BTreeMap<String, usize>,
    pub status_distribution: BTreeMap<String, usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub by_property: Option<BTreeMap<String, CategoryStats>>,
}

/// Result of the optional minimization pass over a failing property input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinimizedCase {
    pub property: String,
    pub test_name: String,
    pub bug_type: BugType,
    pub original_length: usize,
    pub minimized_length: usize,
    pub minimized_preview: String,
    pub attempts: usize,
}
