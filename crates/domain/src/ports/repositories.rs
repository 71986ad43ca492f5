use async_trait::async_trait;
use uuid::Uuid;

use crate::models::product::{DatasetStats, Product, ProductData};
use crate::models::score::{ScoreBreakdown, ScoreRecord, ScoringWeights};
use crate::models::subscription::Subscription;
use crate::ScoutResult;

#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Insert-or-update keyed on the product name. Must be atomic with
    /// respect to concurrent writers for the same key.
    async fn upsert_by_name(&self, data: &ProductData) -> ScoutResult<Product>;

    async fn get_by_id(&self, id: i64) -> ScoutResult<Option<Product>>;

    /// Maxima over all products, for score normalization.
    async fn dataset_stats(&self) -> ScoutResult<DatasetStats>;
}

#[async_trait]
pub trait ScoreRepository: Send + Sync {
    /// Append a new score record for the product; earlier records stay.
    async fn save_score(&self, product_id: i64, breakdown: &ScoreBreakdown)
        -> ScoutResult<ScoreRecord>;

    async fn latest_for_product(&self, product_id: i64) -> ScoutResult<Option<ScoreRecord>>;

    /// Configured weight vector; criteria without a row default to 1.
    async fn current_weights(&self) -> ScoutResult<ScoringWeights>;
}

#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    async fn active_for_product(&self, product_id: i64) -> ScoutResult<Vec<Subscription>>;
}

/// Campaign-scoped qualifying set. Counts distinct products whose latest
/// score cleared the threshold during one coordinator run.
#[async_trait]
pub trait CampaignRepository: Send + Sync {
    /// Idempotent: recording the same product twice keeps one entry.
    async fn add_qualifying(
        &self,
        campaign_id: Uuid,
        product_id: i64,
        score: f64,
    ) -> ScoutResult<()>;

    async fn qualifying_count(&self, campaign_id: Uuid) -> ScoutResult<u64>;
}
