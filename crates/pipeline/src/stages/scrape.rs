use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use scout_domain::{
    queues, Broker, EnqueueOptions, ProductRepository, ScorePayload, ScoutError, ScoutResult,
    ScrapePayload, TaskHandler,
};

use crate::extract::{extract_product, ExtractionRules};

const SCORE_MAX_ATTEMPTS: u32 = 3;
const SCORE_BACKOFF_BASE_MS: u64 = 1000;

/// Consumes scrape tasks: fetch the listing page, extract and validate the
/// product record, upsert it and hand the product to the score queue.
pub struct ScrapeStage {
    fetcher: Arc<dyn scout_domain::PageFetcher>,
    products: Arc<dyn ProductRepository>,
    broker: Arc<dyn Broker>,
    rules: ExtractionRules,
}

impl ScrapeStage {
    pub fn new(
        fetcher: Arc<dyn scout_domain::PageFetcher>,
        products: Arc<dyn ProductRepository>,
        broker: Arc<dyn Broker>,
        rules: ExtractionRules,
    ) -> Self {
        Self {
            fetcher,
            products,
            broker,
            rules,
        }
    }
}

#[async_trait]
impl TaskHandler for ScrapeStage {
    async fn handle(&self, payload: serde_json::Value) -> ScoutResult<()> {
        let payload: ScrapePayload = serde_json::from_value(payload)?;

        // Fetch errors are transient: surface them so the broker retries.
        let html = self.fetcher.fetch(&payload.url).await?;

        let data = match extract_product(&html, &self.rules) {
            Ok(data) => data,
            Err(err @ ScoutError::Validation(_)) => {
                // Data-quality event, not a task failure.
                warn!("Discarding listing at {}: {}", payload.url, err);
                return Ok(());
            }
            Err(err) => return Err(err),
        };

        let product = self.products.upsert_by_name(&data).await?;
        info!("Saved product '{}' (id {})", product.name, product.id);

        let score = ScorePayload {
            campaign_id: payload.campaign_id,
            product_id: product.id,
        };
        self.broker
            .enqueue(
                queues::SCORE,
                serde_json::to_value(&score)?,
                EnqueueOptions::with_retries(
                    SCORE_MAX_ATTEMPTS,
                    Duration::from_millis(SCORE_BACKOFF_BASE_MS),
                ),
            )
            .await?;
        Ok(())
    }
}
