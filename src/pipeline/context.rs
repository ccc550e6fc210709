use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::config::TargetConfig;
use crate::probe::{Executor, SessionCredential, Transport};
use super::driver::CampaignDriver;
use super::events::RunEvent;
use super::ledger::Ledger;
use super::state::Stage;

/// Shared handles every stage is built from.
#[derive(Clone)]
pub struct StageContext {
    pub config: Arc<TargetConfig>,
    pub transport: Arc<dyn Transport>,
    pub cancel_token: CancellationToken,
    pub event_tx: Option<mpsc::UnboundedSender<RunEvent>>,
}

impl StageContext {
    pub fn new(config: Arc<TargetConfig>, transport: Arc<dyn Transport>) -> Self {
        Self {
            config,
            transport,
            cancel_token: CancellationToken::new(),
            event_tx: None,
        }
    }

    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel_token = token;
        self
    }

    pub fn with_event_channel(mut self, tx: mpsc::UnboundedSender<RunEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    pub fn emit(&self, event: RunEvent) {
        if let Some(ref tx) = self.event_tx {
            let _ = tx.send(event);
        }
    }

    /// Executor carrying `credential` as the session Authorization value.
    pub fn executor(&self, credential: Option<&str>, timeout: Duration) -> Executor {
        let session = Arc::new(SessionCredential::new(credential.map(str::to_string)));
        Executor::new(self.transport.clone(), &self.config.base_url, session, timeout)
    }

    /// Driver for `stage`, journaling to `<results_dir>/<stage>_ledger.jsonl`.
    /// Falls back to an in-memory ledger if the journal cannot be opened.
    pub async fn driver(&self, stage: Stage, executor: Executor, pacing: Duration) -> CampaignDriver {
        let journal_path = self.config.results_dir.join(stage.ledger_filename());
        let ledger = match Ledger::with_journal(&journal_path).await {
            Ok(ledger) => ledger,
            Err(e) => {
                warn!(path = %journal_path.display(), error = %e, "Ledger journal unavailable; keeping records in memory");
                Ledger::in_memory()
            }
        };
        CampaignDriver::new(stage, executor, Arc::new(ledger))
            .with_pacing(pacing)
            .with_cancel_token(self.cancel_token.clone())
            .with_event_channel(self.event_tx.clone())
    }
}
