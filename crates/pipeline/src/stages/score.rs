use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use scout_domain::{
    queues, AlertPayload, Broker, CampaignRepository, EnqueueOptions, ProductRepository,
    ScorePayload, ScoreRepository, ScoutResult, TaskHandler,
};

use crate::scoring;

/// Consumes score tasks: loads the product and dataset maxima, runs the
/// scoring algorithm, persists the record and flags qualifying products.
pub struct ScoreStage {
    products: Arc<dyn ProductRepository>,
    scores: Arc<dyn ScoreRepository>,
    campaigns: Arc<dyn CampaignRepository>,
    broker: Arc<dyn Broker>,
    /// Qualifying threshold on the 0-1 scale.
    threshold: f64,
}

impl ScoreStage {
    pub fn new(
        products: Arc<dyn ProductRepository>,
        scores: Arc<dyn ScoreRepository>,
        campaigns: Arc<dyn CampaignRepository>,
        broker: Arc<dyn Broker>,
        threshold: f64,
    ) -> Self {
        Self {
            products,
            scores,
            campaigns,
            broker,
            threshold,
        }
    }
}

#[async_trait]
impl TaskHandler for ScoreStage {
    async fn handle(&self, payload: serde_json::Value) -> ScoutResult<()> {
        let payload: ScorePayload = serde_json::from_value(payload)?;

        let Some(product) = self.products.get_by_id(payload.product_id).await? else {
            warn!(
                "Product {} not found for scoring, skipping",
                payload.product_id
            );
            return Ok(());
        };

        let stats = self.products.dataset_stats().await?;
        let weights = self.scores.current_weights().await?;
        let breakdown = scoring::score_product(&product, &stats, &weights);

        self.scores.save_score(product.id, &breakdown).await?;
        info!(
            "Scored product {} ('{}'): {:.3}",
            product.id, product.name, breakdown.final_score
        );

        if breakdown.final_score >= self.threshold {
            self.campaigns
                .add_qualifying(payload.campaign_id, product.id, breakdown.final_score)
                .await?;
            info!(
                "Product {} qualifies for campaign {} ({:.3} >= {:.3})",
                product.id, payload.campaign_id, breakdown.final_score, self.threshold
            );
            let alert = AlertPayload {
                product_id: product.id,
                score: breakdown.final_score,
            };
            self.broker
                .enqueue(
                    queues::ALERT,
                    serde_json::to_value(&alert)?,
                    EnqueueOptions::default(),
                )
                .await?;
        }
        Ok(())
    }
}
