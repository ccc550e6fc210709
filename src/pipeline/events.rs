use crate::models::{BugType, Category};
use super::state::{CampaignPhase, Stage};

/// Progress messages sent from stages to the console renderer.
#[derive(Debug, Clone)]
pub enum RunEvent {
    StageStarted {
        stage: Stage,
    },
    PhaseChanged {
        stage: Stage,
        phase: CampaignPhase,
    },
    /// A batch of tests is about to run.
    BatchStarted {
        label: String,
        total: usize,
    },
    TestCompleted {
        test_name: String,
        is_bug: bool,
        bug_type: BugType,
    },
    CategoryCompleted {
        category: Category,
        total: usize,
        bugs: usize,
    },
    StageCompleted {
        stage: Stage,
        total: usize,
        bugs: usize,
        interrupted: bool,
    },
    StageSkipped {
        stage: Stage,
        reason: String,
    },
}
