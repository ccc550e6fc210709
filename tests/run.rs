mod common;

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use kbfuzz::config::{StageSelector, TrialCounts};
use kbfuzz::pipeline::{RunEvent, RunOrchestrator, Stage, StageStatus};
use kbfuzz::probe::HttpTransport;

use common::{closed_addr, spawn_target, target_config};

fn small_trials() -> TrialCounts {
    TrialCounts { create_knowledge: 2, search_knowledge: 2, random_endpoint: 2, malformed_json: 2 }
}

#[tokio::test]
async fn test_missing_dataset_skips_dependent_stages_only() {
    let (_mock, addr) = spawn_target().await;
    let dir = tempfile::tempdir().unwrap();
    let mut config = target_config(addr, dir.path());
    config.resource_id = None;
    config.property.trials = small_trials();

    let orchestrator = RunOrchestrator::new(config, Arc::new(HttpTransport::new().unwrap()), StageSelector::All);
    let summary = orchestrator.run().await;

    let stages: Vec<Stage> = summary.outcomes.iter().map(|o| o.stage).collect();
    assert_eq!(stages, vec![Stage::File, Stage::Api, Stage::Property]);
    assert!(matches!(summary.outcomes[0].status, StageStatus::Skipped(_)));
    assert!(matches!(summary.outcomes[1].status, StageStatus::Skipped(_)));
    assert!(matches!(summary.outcomes[2].status, StageStatus::Completed(_)));
    assert!(!summary.failed());

    assert_eq!(summary.reports.len(), 1);
    assert_eq!(summary.reports[0].stage, Stage::Property);
}

#[tokio::test]
async fn test_cancelled_run_skips_everything() {
    let (mock, addr) = spawn_target().await;
    let dir = tempfile::tempdir().unwrap();
    let config = target_config(addr, dir.path());

    let token = CancellationToken::new();
    token.cancel();
    let orchestrator = RunOrchestrator::new(config, Arc::new(HttpTransport::new().unwrap()), StageSelector::All)
        .with_cancel_token(token);
    let summary = orchestrator.run().await;

    assert!(summary.interrupted);
    assert_eq!(summary.outcomes.len(), 3);
    assert!(summary.outcomes.iter().all(|o| matches!(o.status, StageStatus::Skipped(_))));
    assert!(summary.reports.is_empty());
    assert!(mock.requests().is_empty());
}

#[tokio::test]
async fn test_unreachable_target_reports_connection_errors() {
    let addr = closed_addr().await;
    let dir = tempfile::tempdir().unwrap();
    let config = target_config(addr, dir.path());
    let results_dir = config.results_dir.clone();

    let orchestrator = RunOrchestrator::new(config, Arc::new(HttpTransport::new().unwrap()), StageSelector::Api);
    let summary = orchestrator.run().await;

    assert_eq!(summary.outcomes.len(), 1);
    let report = summary.reports().next().unwrap();
    assert!(report.summary.bugs_found > 0);
    let bug_types: Vec<&String> = report.summary.by_bug_type.keys().collect();
    assert_eq!(bug_types, vec!["CONNECTION_ERROR"]);
    assert_eq!(report.summary.by_bug_type["CONNECTION_ERROR"], report.summary.bugs_found);
    assert!(results_dir.join("api_fuzzing_report.json").exists());
}

#[tokio::test]
async fn test_events_bracket_each_stage() {
    let (_mock, addr) = spawn_target().await;
    let dir = tempfile::tempdir().unwrap();
    let mut config = target_config(addr, dir.path());
    config.property.trials = small_trials();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let orchestrator = RunOrchestrator::new(config, Arc::new(HttpTransport::new().unwrap()), StageSelector::Property)
        .with_event_channel(tx);
    let summary = orchestrator.run().await;
    drop(orchestrator);

    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }

    assert!(matches!(events.first(), Some(RunEvent::StageStarted { stage: Stage::Property })));
    let completed = events.iter().filter(|e| matches!(e, RunEvent::TestCompleted { .. })).count();
    assert_eq!(completed, 8);
    assert!(events.iter().any(|e| matches!(e, RunEvent::StageCompleted { stage: Stage::Property, total: 8, .. })));
    assert_eq!(summary.bugs_found(), summary.reports().map(|r| r.bugs.len()).sum::<usize>());
}
