pub mod api_stage;
pub mod context;
pub mod driver;
pub mod events;
pub mod file_stage;
pub mod ledger;
pub mod orchestrator;
pub mod state;

pub use context::StageContext;
pub use driver::{BatchOutcome, CampaignDriver};
pub use events::RunEvent;
pub use ledger::Ledger;
pub use orchestrator::{selected_stages, RunOrchestrator, RunSummary, StageOutcome, StageStatus};
pub use state::{CampaignPhase, CampaignState, Stage};
