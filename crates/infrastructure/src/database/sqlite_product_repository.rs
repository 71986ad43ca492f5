use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use scout_domain::{DatasetStats, Product, ProductData, ProductRepository, ScoutResult};

pub struct SqliteProductRepository {
    pool: SqlitePool,
}

impl SqliteProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn map_row(row: &sqlx::sqlite::SqliteRow) -> ScoutResult<Product> {
        Ok(Product {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            search_volume: row.try_get("search_volume")?,
            sales_rank: row.try_get("sales_rank")?,
            competitor_count: row.try_get("competitor_count")?,
            shipping_cost: row.try_get("shipping_cost")?,
            return_rate: row.try_get("return_rate")?,
            seasonality_variation: row.try_get("seasonality_variation")?,
            has_restrictions: row.try_get("has_restrictions")?,
            selling_price: row.try_get("selling_price")?,
            product_cost: row.try_get("product_cost")?,
            fees: row.try_get("fees")?,
            supplier_rating: row.try_get("supplier_rating")?,
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
            updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
        })
    }
}

#[async_trait]
impl ProductRepository for SqliteProductRepository {
    async fn upsert_by_name(&self, data: &ProductData) -> ScoutResult<Product> {
        let now = Utc::now();
        // Single-statement upsert keeps concurrent writers for the same name
        // from creating duplicate rows.
        let row = sqlx::query(
            r#"
            INSERT INTO products (
                name, search_volume, sales_rank, competitor_count, shipping_cost,
                return_rate, seasonality_variation, has_restrictions, selling_price,
                product_cost, fees, supplier_rating, created_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?13)
            ON CONFLICT(name) DO UPDATE SET
                search_volume = excluded.search_volume,
                sales_rank = excluded.sales_rank,
                competitor_count = excluded.competitor_count,
                shipping_cost = excluded.shipping_cost,
                return_rate = excluded.return_rate,
                seasonality_variation = excluded.seasonality_variation,
                has_restrictions = excluded.has_restrictions,
                selling_price = excluded.selling_price,
                product_cost = excluded.product_cost,
                fees = excluded.fees,
                supplier_rating = excluded.supplier_rating,
                updated_at = excluded.updated_at
            RETURNING *
            "#,
        )
        .bind(&data.name)
        .bind(data.search_volume)
        .bind(data.sales_rank)
        .bind(data.competitor_count)
        .bind(data.shipping_cost)
        .bind(data.return_rate)
        .bind(data.seasonality_variation)
        .bind(data.has_restrictions)
        .bind(data.selling_price)
        .bind(data.product_cost)
        .bind(data.fees)
        .bind(data.supplier_rating)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Self::map_row(&row)
    }

    async fn get_by_id(&self, id: i64) -> ScoutResult<Option<Product>> {
        let row = sqlx::query("SELECT * FROM products WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::map_row).transpose()
    }

    async fn dataset_stats(&self) -> ScoutResult<DatasetStats> {
        let row = sqlx::query(
            r#"
            SELECT
                CAST(COALESCE(MAX(search_volume), 0) AS REAL) AS max_search_volume,
                CAST(COALESCE(MAX(sales_rank), 0) AS REAL) AS max_sales_rank,
                CAST(COALESCE(MAX(competitor_count), 0) AS REAL) AS max_competitor_count,
                CAST(COALESCE(MAX(shipping_cost), 0) AS REAL) AS max_shipping_cost,
                CAST(COALESCE(MAX(return_rate), 0) AS REAL) AS max_return_rate,
                CAST(COALESCE(MAX(seasonality_variation), 0) AS REAL) AS max_seasonality_variation
            FROM products
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(DatasetStats {
            max_search_volume: row.try_get("max_search_volume")?,
            max_sales_rank: row.try_get("max_sales_rank")?,
            max_competitor_count: row.try_get("max_competitor_count")?,
            max_shipping_cost: row.try_get("max_shipping_cost")?,
            max_return_rate: row.try_get("max_return_rate")?,
            max_seasonality_variation: row.try_get("max_seasonality_variation")?,
        })
    }
}
