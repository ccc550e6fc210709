use std::collections::BTreeMap;

use chrono::Utc;

use crate::models::{CampaignReport, CategoryStats, MinimizedCase, OutcomeRecord, ReportMeta, ReportSummary};
use crate::pipeline::state::Stage;

/// Reduce a ledger to its summary. Pure: the same ledger always yields the
/// same numbers, and every map is key-ordered.
pub fn aggregate(records: &[OutcomeRecord]) -> ReportSummary {
    let mut summary = ReportSummary {
        total: records.len(),
        ..ReportSummary::default()
    };
    let mut by_property: BTreeMap<String, CategoryStats> = BTreeMap::new();

    for record in records {
        let stats = summary.by_category.entry(record.category.as_str().to_string()).or_default();
        stats.total += 1;
        if record.is_bug {
            stats.bugs += 1;
            summary.bugs_found += 1;
            *summary.by_bug_type.entry(record.bug_type.as_str().to_string()).or_insert(0) += 1;
        }

        *summary.status_distribution.entry(record.effective_status()).or_insert(0) += 1;

        if let Some(property) = &record.property {
            let stats = by_property.entry(property.clone()).or_default();
            stats.total += 1;
            if record.is_bug {
                stats.bugs += 1;
            }
        }
    }

    if !by_property.is_empty() {
        summary.by_property = Some(by_property);
    }
    summary
}

/// Stage-specific metadata that does not come from the ledger.
#[derive(Debug, Clone, Default)]
pub struct ReportContext {
    pub target: String,
    pub resource_id: Option<String>,
    pub resolved_endpoint: Option<String>,
    pub seed: Option<u64>,
    pub interrupted: bool,
    pub minimized: Vec<MinimizedCase>,
}

pub fn build_report(stage: Stage, context: ReportContext, records: Vec<OutcomeRecord>) -> CampaignReport {
    let summary = aggregate(&records);
    let bugs: Vec<OutcomeRecord> = records.iter().filter(|r| r.is_bug).cloned().collect();

    CampaignReport {
        meta: ReportMeta {
            target: context.target,
            resource_id: context.resource_id,
            stage,
            timestamp: Utc::now(),
            total_tests: records.len(),
            resolved_endpoint: context.resolved_endpoint,
            seed: context.seed,
            interrupted: context.interrupted,
            tool_version: crate::tool_version(),
        },
        summary,
        bugs,
        all_results: records,
        minimized: context.minimized,
    }
}
