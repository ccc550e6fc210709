use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use serde_json::Value;
use tokio::sync::{mpsc, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::errors::KbFuzzError;
use crate::models::{CampaignReport, Category, CredentialMode, OutcomeRecord, Payload};
use crate::probe::{CredentialGuard, Executor};
use crate::reporting::{build_report, write_report, ReportContext};
use super::events::RunEvent;
use super::ledger::Ledger;
use super::state::{CampaignPhase, CampaignState, Stage};

/// How a batch ended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub executed: usize,
    pub bugs: usize,
    pub interrupted: bool,
}

/// Runs ordered batches of payloads through the executor, paces them, and
/// appends every outcome to the stage ledger.
pub struct CampaignDriver {
    stage: Stage,
    executor: Executor,
    ledger: Arc<Ledger>,
    state: RwLock<CampaignState>,
    pacing: Duration,
    max_concurrency: usize,
    cancel_token: CancellationToken,
    event_tx: Option<mpsc::UnboundedSender<RunEvent>>,
}

impl CampaignDriver {
    pub fn new(stage: Stage, executor: Executor, ledger: Arc<Ledger>) -> Self {
        Self {
            stage,
            executor,
            ledger,
            state: RwLock::new(CampaignState::new()),
            pacing: Duration::ZERO,
            max_concurrency: 1,
            cancel_token: CancellationToken::new(),
            event_tx: None,
        }
    }

    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel_token = token;
        self
    }

    pub fn with_event_channel(mut self, tx: Option<mpsc::UnboundedSender<RunEvent>>) -> Self {
        self.event_tx = tx;
        self
    }

    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    pub fn emit(&self, event: RunEvent) {
        if let Some(ref tx) = self.event_tx {
            let _ = tx.send(event);
        }
    }

    pub async fn phase(&self) -> CampaignPhase {
        self.state.read().await.phase
    }

    pub async fn history(&self) -> Vec<CampaignPhase> {
        self.state.read().await.history.clone()
    }

    /// Move the campaign state machine forward.
    pub async fn advance(&self, next: CampaignPhase) -> Result<(), KbFuzzError> {
        self.state.write().await.advance(next)?;
        debug!(stage = %self.stage, phase = %next, "Campaign phase changed");
        self.emit(RunEvent::PhaseChanged { stage: self.stage, phase: next });
        Ok(())
    }

    /// Sleep for the pacing interval. Returns `false` if the run was cancelled
    /// while waiting.
    pub async fn pace(&self) -> bool {
        if self.pacing.is_zero() {
            return !self.is_cancelled();
        }
        tokio::select! {
            _ = tokio::time::sleep(self.pacing) => true,
            _ = self.cancel_token.cancelled() => false,
        }
    }

    /// Execute one payload on its own task so a panic inside the request path
    /// becomes an execution-error record instead of tearing down the run.
    pub async fn run_one(&self, payload: Payload) -> OutcomeRecord {
        self.run_capturing(payload).await.0
    }

    /// [`run_one`](Self::run_one), also returning the parsed response body.
    pub async fn run_capturing(&self, payload: Payload) -> (OutcomeRecord, Option<Value>) {
        let executor = self.executor.clone();
        let fallback = payload.clone();
        match tokio::spawn(async move { executor.execute_capturing(&payload).await }).await {
            Ok(executed) => executed,
            Err(e) => {
                error!(test = %fallback.test_name, error = %e, "Test execution aborted");
                let url = self.executor.build_url(&fallback.path, &fallback.query)
                    .map(|u| u.to_string())
                    .unwrap_or_else(|_| fallback.path.clone());
                let record = OutcomeRecord::execution_failure(&fallback, url, &format!("execution aborted: {}", e));
                (record, None)
            }
        }
    }

    /// Append to the ledger and notify listeners.
    pub async fn commit(&self, record: OutcomeRecord) {
        self.emit(RunEvent::TestCompleted {
            test_name: record.test_name.clone(),
            is_bug: record.is_bug,
            bug_type: record.bug_type,
        });
        self.ledger.append(record).await;
    }

    /// Run one category's payloads. Categories that swap the session
    /// credential always run sequentially inside an override scope.
    pub async fn run_batch(&self, category: Category, payloads: Vec<Payload>) -> Result<BatchOutcome, KbFuzzError> {
        self.advance(CampaignPhase::Executing(category)).await?;
        let total = payloads.len();
        info!(stage = %self.stage, category = %category, total, "Running test batch");
        self.emit(RunEvent::BatchStarted { label: category.display_name().to_string(), total });

        let needs_override = category.mutates_credential()
            || payloads.iter().any(|p| !matches!(p.credential, CredentialMode::Inherit));

        let outcome = if needs_override {
            let guard = self.executor.session().override_scope();
            self.run_sequential(payloads, Some(&guard)).await
        } else if self.max_concurrency > 1 {
            self.run_concurrent(payloads).await
        } else {
            self.run_sequential(payloads, None).await
        };

        if outcome.interrupted {
            warn!(stage = %self.stage, category = %category, executed = outcome.executed, total, "Batch interrupted");
        }
        self.emit(RunEvent::CategoryCompleted { category, total: outcome.executed, bugs: outcome.bugs });
        Ok(outcome)
    }

    async fn run_sequential(&self, payloads: Vec<Payload>, guard: Option<&CredentialGuard<'_>>) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        for (index, payload) in payloads.into_iter().enumerate() {
            if self.is_cancelled() || (index > 0 && !self.pace().await) {
                outcome.interrupted = true;
                break;
            }
            if let Some(guard) = guard {
                apply_credential(guard, &payload.credential);
            }
            let record = self.run_one(payload).await;
            outcome.executed += 1;
            if record.is_bug {
                outcome.bugs += 1;
            }
            self.commit(record).await;
        }
        outcome
    }

    async fn run_concurrent(&self, payloads: Vec<Payload>) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        let mut results = stream::iter(payloads.into_iter().enumerate())
            .map(|(index, payload)| async move {
                if self.is_cancelled() || (index >= self.max_concurrency && !self.pace().await) {
                    return None;
                }
                Some(self.run_one(payload).await)
            })
            .buffer_unordered(self.max_concurrency);

        while let Some(result) = results.next().await {
            match result {
                Some(record) => {
                    outcome.executed += 1;
                    if record.is_bug {
                        outcome.bugs += 1;
                    }
                    self.commit(record).await;
                }
                None => outcome.interrupted = true,
            }
        }
        outcome
    }

    /// Aggregate the ledger, persist the report, and close the state machine.
    pub async fn conclude(&self, results_dir: &Path, mut context: ReportContext) -> Result<CampaignReport, KbFuzzError> {
        self.advance(CampaignPhase::Aggregating).await?;
        context.interrupted = context.interrupted || self.is_cancelled();
        let records = self.ledger.snapshot().await;
        let report = build_report(self.stage, context, records);
        write_report(results_dir, &report).await?;
        self.advance(CampaignPhase::Done).await?;
        self.emit(RunEvent::StageCompleted {
            stage: self.stage,
            total: report.summary.total,
            bugs: report.summary.bugs_found,
            interrupted: report.meta.interrupted,
        });
        Ok(report)
    }
}

fn apply_credential(guard: &CredentialGuard<'_>, mode: &CredentialMode) {
    match mode {
        CredentialMode::Inherit => guard.set(guard.original().map(str::to_string)),
        CredentialMode::Remove => guard.set(None),
        CredentialMode::Replace(value) => guard.set(Some(value.clone())),
    }
}
