use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Queue names, one per pipeline stage.
pub mod queues {
    pub const SEARCH: &str = "product_search";
    pub const SCRAPE: &str = "product_scrape";
    pub const SCORE: &str = "product_score";
    pub const ALERT: &str = "alert";
}

/// Lifecycle state of a task, owned by the broker.
///
/// Transitions are monotonic (`Queued -> Active -> {Completed|Failed}`);
/// the broker alone may move a failed attempt back to `Queued` while retry
/// budget remains.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Queued,
    Active,
    Completed,
    Failed,
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Completed | TaskState::Failed)
    }
}

/// Retry policy attached to a task at enqueue time.
#[derive(Debug, Clone)]
pub struct EnqueueOptions {
    pub max_attempts: u32,
    /// Base delay for exponential backoff: `base * 2^(attempt-1)`.
    pub backoff_base: Duration,
}

impl Default for EnqueueOptions {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            backoff_base: Duration::from_millis(1000),
        }
    }
}

impl EnqueueOptions {
    pub fn with_retries(max_attempts: u32, backoff_base: Duration) -> Self {
        Self {
            max_attempts,
            backoff_base,
        }
    }
}

pub const SEARCH_LIMIT_DEFAULT: u32 = 10;
pub const SEARCH_LIMIT_MAX: u32 = 100;

/// Filters for a product search round.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchParams {
    pub keywords: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub min_price: Option<f64>,
    #[serde(default)]
    pub max_price: Option<f64>,
    #[serde(default = "default_search_limit")]
    pub limit: u32,
}

fn default_search_limit() -> u32 {
    SEARCH_LIMIT_DEFAULT
}

impl SearchParams {
    pub fn new<S: Into<String>>(keywords: S) -> Self {
        Self {
            keywords: keywords.into(),
            category: None,
            min_price: None,
            max_price: None,
            limit: SEARCH_LIMIT_DEFAULT,
        }
    }

    /// Per-source URL cap, clamped to `1..=100`.
    pub fn effective_limit(&self) -> u32 {
        self.limit.clamp(1, SEARCH_LIMIT_MAX)
    }

    pub fn validate(&self) -> crate::ScoutResult<()> {
        if self.keywords.trim().is_empty() {
            return Err(crate::ScoutError::validation_error(
                "search keywords must not be empty",
            ));
        }
        Ok(())
    }
}

/// Payload of a search task. Carries the campaign id so downstream stages
/// can attribute qualifying products to the right run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchPayload {
    pub campaign_id: Uuid,
    pub params: SearchParams,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapePayload {
    pub campaign_id: Uuid,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScorePayload {
    pub campaign_id: Uuid,
    pub product_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertPayload {
    pub product_id: i64,
    pub score: f64,
}
