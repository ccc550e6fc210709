use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::{StageSelector, TargetConfig};
use crate::errors::KbFuzzError;
use crate::models::CampaignReport;
use crate::probe::Transport;
use crate::property::run_property_stage;
use crate::reporting::{list_reports, ReportFile};
use super::api_stage::run_api_stage;
use super::context::StageContext;
use super::events::RunEvent;
use super::file_stage::run_file_stage;
use super::state::Stage;

/// Stages a selector enables, in run order.
pub fn selected_stages(selector: StageSelector) -> Vec<Stage> {
    let mut stages = Vec::new();
    if selector.includes_file() {
        stages.push(Stage::File);
    }
    if selector.includes_api() {
        stages.push(Stage::Api);
    }
    if selector.includes_property() {
        stages.push(Stage::Property);
    }
    stages
}

#[derive(Debug)]
pub enum StageStatus {
    Completed(Box<CampaignReport>),
    /// The stage could not start (configuration) or the run was interrupted
    /// before reaching it.
    Skipped(String),
    /// The stage started but could not persist its report.
    Failed(String),
}

#[derive(Debug)]
pub struct StageOutcome {
    pub stage: Stage,
    pub status: StageStatus,
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub outcomes: Vec<StageOutcome>,
    pub reports: Vec<ReportFile>,
    pub interrupted: bool,
}

impl RunSummary {
    pub fn reports(&self) -> impl Iterator<Item = &CampaignReport> {
        self.outcomes.iter().filter_map(|o| match &o.status {
            StageStatus::Completed(report) => Some(report.as_ref()),
            _ => None,
        })
    }

    pub fn bugs_found(&self) -> usize {
        self.reports().map(|r| r.summary.bugs_found).sum()
    }

    pub fn failed(&self) -> bool {
        self.outcomes.iter().any(|o| matches!(o.status, StageStatus::Failed(_)))
    }
}

/// Runs the selected stages in order. A stage that cannot start is skipped
/// without affecting the others; cancellation skips whatever remains.
pub struct RunOrchestrator {
    ctx: StageContext,
    selector: StageSelector,
}

impl RunOrchestrator {
    pub fn new(config: TargetConfig, transport: Arc<dyn Transport>, selector: StageSelector) -> Self {
        Self {
            ctx: StageContext::new(Arc::new(config), transport),
            selector,
        }
    }

    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.ctx = self.ctx.with_cancel_token(token);
        self
    }

    /// Attach an event channel for progress rendering.
    pub fn with_event_channel(mut self, tx: mpsc::UnboundedSender<RunEvent>) -> Self {
        self.ctx = self.ctx.with_event_channel(tx);
        self
    }

    pub fn config(&self) -> &TargetConfig {
        &self.ctx.config
    }

    pub async fn run(&self) -> RunSummary {
        let mut summary = RunSummary::default();
        info!(
            target = %self.ctx.config.base_url,
            mode = %self.selector,
            results_dir = %self.ctx.config.results_dir.display(),
            "Starting fuzzing run"
        );

        for stage in selected_stages(self.selector) {
            if self.ctx.cancel_token.is_cancelled() {
                summary.interrupted = true;
                let reason = "run interrupted".to_string();
                self.ctx.emit(RunEvent::StageSkipped { stage, reason: reason.clone() });
                summary.outcomes.push(StageOutcome { stage, status: StageStatus::Skipped(reason) });
                continue;
            }

            self.ctx.emit(RunEvent::StageStarted { stage });
            let status = match self.run_stage(stage).await {
                Ok(report) => {
                    if report.meta.interrupted {
                        summary.interrupted = true;
                    }
                    StageStatus::Completed(Box::new(report))
                }
                Err(e) => self.stage_error(stage, e),
            };
            summary.outcomes.push(StageOutcome { stage, status });
        }

        summary.reports = list_reports(&self.ctx.config.results_dir).await;
        info!(
            reports = summary.reports.len(),
            bugs = summary.bugs_found(),
            interrupted = summary.interrupted,
            "Fuzzing run finished"
        );
        summary
    }

    async fn run_stage(&self, stage: Stage) -> Result<CampaignReport, KbFuzzError> {
        match stage {
            Stage::File => run_file_stage(&self.ctx).await,
            Stage::Api => run_api_stage(&self.ctx).await,
            Stage::Property => run_property_stage(&self.ctx).await,
        }
    }

    fn stage_error(&self, stage: Stage, e: KbFuzzError) -> StageStatus {
        let classification = e.classify();
        if matches!(e, KbFuzzError::Config(_)) {
            warn!(stage = %stage, error = %e, "Stage skipped");
            self.ctx.emit(RunEvent::StageSkipped { stage, reason: e.to_string() });
            StageStatus::Skipped(e.to_string())
        } else {
            error!(
                stage = %stage,
                error_type = classification.error_type,
                stage_fatal = classification.stage_fatal,
                error = %e,
                "Stage failed"
            );
            self.ctx.emit(RunEvent::StageSkipped { stage, reason: e.to_string() });
            StageStatus::Failed(e.to_string())
        }
    }
}
