use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use tracing::warn;

use scout_domain::{
    Criterion, CriterionScores, ScoreBreakdown, ScoreRecord, ScoreRepository, ScoringWeights,
    ScoutResult,
};

pub struct SqliteScoreRepository {
    pool: SqlitePool,
}

impl SqliteScoreRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn map_row(row: &sqlx::sqlite::SqliteRow) -> ScoutResult<ScoreRecord> {
        Ok(ScoreRecord {
            id: row.try_get("id")?,
            product_id: row.try_get("product_id")?,
            scores: CriterionScores {
                demand: row.try_get("demand")?,
                competition: row.try_get("competition")?,
                profit_margin: row.try_get("profit_margin")?,
                supplier_reliability: row.try_get("supplier_reliability")?,
                shipping_handling: row.try_get("shipping_handling")?,
                return_rate: row.try_get("return_rate")?,
                seasonality: row.try_get("seasonality")?,
                product_restrictions: row.try_get("product_restrictions")?,
            },
            final_score: row.try_get("final_score")?,
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        })
    }

    /// Replace the stored weight for one criterion.
    pub async fn set_weight(&self, criterion: Criterion, weight: f64) -> ScoutResult<()> {
        sqlx::query(
            r#"
            INSERT INTO scoring_weights (criterion, weight) VALUES (?1, ?2)
            ON CONFLICT(criterion) DO UPDATE SET weight = excluded.weight
            "#,
        )
        .bind(criterion.as_str())
        .bind(weight)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl ScoreRepository for SqliteScoreRepository {
    async fn save_score(
        &self,
        product_id: i64,
        breakdown: &ScoreBreakdown,
    ) -> ScoutResult<ScoreRecord> {
        let row = sqlx::query(
            r#"
            INSERT INTO product_scores (
                product_id, demand, competition, profit_margin, supplier_reliability,
                shipping_handling, return_rate, seasonality, product_restrictions,
                final_score, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            RETURNING *
            "#,
        )
        .bind(product_id)
        .bind(breakdown.scores.demand)
        .bind(breakdown.scores.competition)
        .bind(breakdown.scores.profit_margin)
        .bind(breakdown.scores.supplier_reliability)
        .bind(breakdown.scores.shipping_handling)
        .bind(breakdown.scores.return_rate)
        .bind(breakdown.scores.seasonality)
        .bind(breakdown.scores.product_restrictions)
        .bind(breakdown.final_score)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Self::map_row(&row)
    }

    async fn latest_for_product(&self, product_id: i64) -> ScoutResult<Option<ScoreRecord>> {
        let row = sqlx::query(
            "SELECT * FROM product_scores WHERE product_id = ?1 ORDER BY id DESC LIMIT 1",
        )
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(Self::map_row).transpose()
    }

    async fn current_weights(&self) -> ScoutResult<ScoringWeights> {
        let rows = sqlx::query("SELECT criterion, weight FROM scoring_weights")
            .fetch_all(&self.pool)
            .await?;

        let mut weights = ScoringWeights::default();
        for row in rows {
            let name: String = row.try_get("criterion")?;
            match Criterion::parse(&name) {
                Ok(criterion) => weights.set(criterion, row.try_get("weight")?),
                Err(_) => warn!("Ignoring weight for unknown criterion: {}", name),
            }
        }
        Ok(weights)
    }
}
