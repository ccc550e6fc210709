use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

use crate::errors::KbFuzzError;
use crate::models::Category;

/// One independently runnable testing stage.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    File,
    Api,
    Property,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::File, Stage::Api, Stage::Property];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Api => "api",
            Self::Property => "property",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::File => "File Upload Fuzzing",
            Self::Api => "API Security Fuzzing",
            Self::Property => "Property Trials",
        }
    }

    pub fn report_filename(&self) -> String {
        format!("{}_fuzzing_report.json", self.as_str())
    }

    pub fn ledger_filename(&self) -> String {
        format!("{}_ledger.jsonl", self.as_str())
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Campaign lifecycle:
/// `Idle -> Discovering -> Executing(c1) -> ... -> Aggregating -> Done`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "phase", content = "category", rename_all = "snake_case")]
pub enum CampaignPhase {
    Idle,
    Discovering,
    Executing(Category),
    Aggregating,
    Done,
}

impl std::fmt::Display for CampaignPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Discovering => write!(f, "discovering"),
            Self::Executing(category) => write!(f, "executing({})", category),
            Self::Aggregating => write!(f, "aggregating"),
            Self::Done => write!(f, "done"),
        }
    }
}

impl CampaignPhase {
    fn can_advance_to(&self, next: &CampaignPhase) -> bool {
        use CampaignPhase::*;
        matches!(
            (self, next),
            (Idle, Discovering)
                | (Idle, Executing(_))
                | (Discovering, Executing(_))
                | (Discovering, Aggregating)
                | (Executing(_), Executing(_))
                | (Executing(_), Aggregating)
                | (Aggregating, Done)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignState {
    pub phase: CampaignPhase,
    pub history: Vec<CampaignPhase>,
    pub start_time: DateTime<Utc>,
}

impl CampaignState {
    pub fn new() -> Self {
        Self {
            phase: CampaignPhase::Idle,
            history: vec![CampaignPhase::Idle],
            start_time: Utc::now(),
        }
    }

    pub fn advance(&mut self, next: CampaignPhase) -> Result<(), KbFuzzError> {
        if !self.phase.can_advance_to(&next) {
            return Err(KbFuzzError::Internal(format!(
                "illegal campaign transition {} -> {}",
                self.phase, next
            )));
        }
        self.phase = next;
        self.history.push(next);
        Ok(())
    }

    pub fn is_done(&self) -> bool {
        self.phase == CampaignPhase::Done
    }
}

impl Default for CampaignState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_filenames() {
        assert_eq!(Stage::File.report_filename(), "file_fuzzing_report.json");
        assert_eq!(Stage::Api.report_filename(), "api_fuzzing_report.json");
        assert_eq!(Stage::Property.report_filename(), "property_fuzzing_report.json");
        assert_eq!(Stage::Api.ledger_filename(), "api_ledger.jsonl");
    }

    #[test]
    fn test_full_campaign_lifecycle() {
        let mut state = CampaignState::new();
        state.advance(CampaignPhase::Discovering).unwrap();
        state.advance(CampaignPhase::Executing(Category::SqlInjection)).unwrap();
        state.advance(CampaignPhase::Executing(Category::Xss)).unwrap();
        state.advance(CampaignPhase::Aggregating).unwrap();
        state.advance(CampaignPhase::Done).unwrap();
        assert!(state.is_done());
        assert_eq!(state.history.len(), 6);
        assert_eq!(state.history[2], CampaignPhase::Executing(Category::SqlInjection));
    }

    #[test]
    fn test_illegal_transitions_rejected() {
        let mut state = CampaignState::new();
        assert!(state.advance(CampaignPhase::Done).is_err());
        assert!(state.advance(CampaignPhase::Aggregating).is_err());
        state.advance(CampaignPhase::Discovering).unwrap();
        assert!(state.advance(CampaignPhase::Idle).is_err());
        assert_eq!(state.phase, CampaignPhase::Discovering);
    }

    #[test]
    fn test_stage_serialization() {
        assert_eq!(serde_json::to_string(&Stage::Property).unwrap(), "\"property\"");
        let phase = serde_json::to_value(CampaignPhase::Executing(Category::Idor)).unwrap();
        assert_eq!(phase["phase"], "executing");
        assert_eq!(phase["category"], "IDOR");
    }
}
