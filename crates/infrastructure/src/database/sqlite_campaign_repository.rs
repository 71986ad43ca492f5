use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use scout_domain::{CampaignRepository, ScoutResult};

pub struct SqliteCampaignRepository {
    pool: SqlitePool,
}

impl SqliteCampaignRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CampaignRepository for SqliteCampaignRepository {
    async fn add_qualifying(
        &self,
        campaign_id: Uuid,
        product_id: i64,
        score: f64,
    ) -> ScoutResult<()> {
        // DO NOTHING keeps the first score recorded for a product; the set
        // only ever grows within a campaign.
        sqlx::query(
            r#"
            INSERT INTO campaign_products (campaign_id, product_id, score, created_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(campaign_id, product_id) DO NOTHING
            "#,
        )
        .bind(campaign_id.to_string())
        .bind(product_id)
        .bind(score)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn qualifying_count(&self, campaign_id: Uuid) -> ScoutResult<u64> {
        let row =
            sqlx::query("SELECT COUNT(*) AS n FROM campaign_products WHERE campaign_id = ?1")
                .bind(campaign_id.to_string())
                .fetch_one(&self.pool)
                .await?;
        let count: i64 = row.try_get("n")?;
        Ok(count as u64)
    }
}
