use std::path::{Path, PathBuf};

use tracing::info;

use crate::errors::KbFuzzError;
use crate::models::CampaignReport;
use crate::pipeline::state::Stage;

/// Write to a temporary sibling, then rename over the target.
pub async fn atomic_write(path: &Path, content: &str) -> Result<(), KbFuzzError> {
    let tmp = path.with_extension("tmp");
    tokio::fs::write(&tmp, content).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

pub async fn write_report(results_dir: &Path, report: &CampaignReport) -> Result<PathBuf, KbFuzzError> {
    tokio::fs::create_dir_all(results_dir).await?;
    let path = results_dir.join(report.meta.stage.report_filename());
    let json = serde_json::to_string_pretty(report)?;
    atomic_write(&path, &json).await?;
    info!(
        path = %path.display(),
        total = report.summary.total,
        bugs = report.summary.bugs_found,
        "Report written"
    );
    Ok(path)
}

pub async fn read_report(path: &Path) -> Result<CampaignReport, KbFuzzError> {
    let content = tokio::fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&content)?)
}

#[derive(Debug, Clone)]
pub struct ReportFile {
    pub stage: Stage,
    pub path: PathBuf,
    pub size: u64,
}

/// Stage reports present in `results_dir`, in stage order.
pub async fn list_reports(results_dir: &Path) -> Vec<ReportFile> {
    let mut found = Vec::new();
    for stage in Stage::ALL {
        let path = results_dir.join(stage.report_filename());
        if let Ok(meta) = tokio::fs::metadata(&path).await {
            found.push(ReportFile { stage, path, size: meta.len() });
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::outcome::sample_record;
    use crate::models::{BugType, Category, HttpStatus};
    use crate::reporting::aggregator::{build_report, ReportContext};

    #[tokio::test]
    async fn test_atomic_write_leaves_no_tmp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        atomic_write(&path, "{}").await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");
        assert!(!dir.path().join("report.tmp").exists());
    }

    #[tokio::test]
    async fn test_write_then_read_report() {
        let dir = tempfile::tempdir().unwrap();
        let results = dir.path().join("results");
        let records = vec![
            sample_record("a", Category::MalformedFile, Some(HttpStatus::Code(500)), None, BugType::ServerError),
            sample_record("b", Category::MalformedFile, Some(HttpStatus::Code(200)), Some(200), BugType::None),
        ];
        let context = ReportContext {
            target: "http://localhost".into(),
            resolved_endpoint: Some("/admin/api/workspace/default/knowledge/kb/document".into()),
            ..ReportContext::default()
        };
        let report = build_report(Stage::File, context, records);
        let path = write_report(&results, &report).await.unwrap();
        assert_eq!(path.file_name().unwrap(), "file_fuzzing_report.json");

        let loaded = read_report(&path).await.unwrap();
        assert_eq!(loaded.summary, report.summary);
        assert_eq!(loaded.bugs.len(), 1);
        assert_eq!(loaded.meta.resolved_endpoint, report.meta.resolved_endpoint);
    }

    #[tokio::test]
    async fn test_list_reports_in_stage_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("property_fuzzing_report.json"), "{}").unwrap();
        std::fs::write(dir.path().join("file_fuzzing_report.json"), "{\"a\":1}").unwrap();
        std::fs::write(dir.path().join("unrelated.json"), "{}").unwrap();

        let reports = list_reports(dir.path()).await;
        let stages: Vec<Stage> = reports.iter().map(|r| r.stage).collect();
        assert_eq!(stages, vec![Stage::File, Stage::Property]);
        assert_eq!(reports[0].size, 7);
    }
}
