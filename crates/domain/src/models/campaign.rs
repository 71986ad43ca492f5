use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Coordinator state machine per campaign.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    Idle,
    Searching,
    Waiting,
    Evaluating,
    Done,
    Aborted,
}

impl CampaignStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, CampaignStatus::Done | CampaignStatus::Aborted)
    }
}

/// Final report for one coordinator run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CampaignOutcome {
    pub campaign_id: Uuid,
    pub status: CampaignStatus,
    /// Qualifying products collected when the campaign ended.
    pub collected: u64,
    pub iterations: u32,
}
