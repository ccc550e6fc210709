use console::style;

use crate::models::{CampaignReport, OutcomeRecord};
use crate::utils::format_bytes;
use super::writer::ReportFile;

/// Bugs listed in the console summary before eliding the rest.
pub const MAX_LISTED_BUGS: usize = 30;

pub fn format_stage_summary(report: &CampaignReport) -> String {
    let summary = &report.summary;
    let mut out = String::new();

    out.push_str(&format!(
        "\n{}\n",
        style(format!("== {} ==", report.meta.stage.display_name())).bold()
    ));
    if report.meta.interrupted {
        out.push_str(&format!("{}\n", style("Run interrupted; partial results").yellow()));
    }
    if let Some(endpoint) = &report.meta.resolved_endpoint {
        out.push_str(&format!("Endpoint: {}\n", endpoint));
    }
    if let Some(seed) = report.meta.seed {
        out.push_str(&format!("Seed: {}\n", seed));
    }

    let bugs = if summary.bugs_found > 0 {
        style(summary.bugs_found.to_string()).red().bold()
    } else {
        style(summary.bugs_found.to_string()).green()
    };
    out.push_str(&format!("Total tests: {}  Bugs: {}\n", summary.total, bugs));

    out.push_str("\nBy category:\n");
    for (category, stats) in &summary.by_category {
        out.push_str(&format!("  {:<16} {:>5} tests  {:>4} bugs\n", category, stats.total, stats.bugs));
    }

    if let Some(by_property) = &summary.by_property {
        out.push_str("\nBy property:\n");
        for (property, stats) in by_property {
            out.push_str(&format!("  {:<18} {:>5} trials {:>4} bugs\n", property, stats.total, stats.bugs));
        }
    }

    out.push_str("\nStatus distribution:\n");
    for (status, count) in &summary.status_distribution {
        out.push_str(&format!("  {:<16} {:>5}\n", status, count));
    }

    if !report.bugs.is_empty() {
        out.push_str(&format!("\n{}\n", style("Bugs:").red().bold()));
        for bug in report.bugs.iter().take(MAX_LISTED_BUGS) {
            out.push_str(&format_bug_line(bug));
        }
        if report.bugs.len() > MAX_LISTED_BUGS {
            out.push_str(&format!("  ... and {} more\n", report.bugs.len() - MAX_LISTED_BUGS));
        }
    }

    for case in &report.minimized {
        out.push_str(&format!(
            "  minimized {} [{}]: {} -> {} chars ({} attempts) {}\n",
            case.test_name, case.bug_type, case.original_length, case.minimized_length,
            case.attempts, case.minimized_preview
        ));
    }

    out
}

fn format_bug_line(record: &OutcomeRecord) -> String {
    format!(
        "  [{}] {} {} {} -> {}\n",
        style(record.bug_type.as_str()).red(),
        record.test_name,
        record.method,
        record.url,
        record.effective_status(),
    )
}

pub fn format_report_listing(reports: &[ReportFile]) -> String {
    if reports.is_empty() {
        return "No reports written.\n".to_string();
    }
    let mut out = String::from("\nReports:\n");
    for report in reports {
        out.push_str(&format!("  {} ({})\n", report.path.display(), format_bytes(report.size)));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::outcome::sample_record;
    use crate::models::{BugType, Category, HttpStatus};
    use crate::pipeline::state::Stage;
    use crate::reporting::aggregator::{build_report, ReportContext};

    #[test]
    fn test_summary_caps_bug_listing() {
        console::set_colors_enabled(false);
        let records: Vec<_> = (0..35)
            .map(|i| sample_record(&format!("bug_{}", i), Category::Boundary, Some(HttpStatus::Code(500)), None, BugType::ServerError))
            .collect();
        let report = build_report(Stage::Api, ReportContext::default(), records);
        let text = format_stage_summary(&report);
        assert!(text.contains("bug_29"));
        assert!(!text.contains("bug_30 "));
        assert!(text.contains("... and 5 more"));
        assert!(text.contains("BOUNDARY"));
    }

    #[test]
    fn test_report_listing() {
        let files = vec![ReportFile {
            stage: Stage::File,
            path: "results/file_fuzzing_report.json".into(),
            size: 2048,
        }];
        let text = format_report_listing(&files);
        assert!(text.contains("file_fuzzing_report.json (2.0 KiB)"));
        assert_eq!(format_report_listing(&[]), "No reports written.\n");
    }
}
