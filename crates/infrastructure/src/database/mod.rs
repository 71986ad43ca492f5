use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::debug;

use scout_domain::ScoutResult;

mod sqlite_campaign_repository;
mod sqlite_product_repository;
mod sqlite_score_repository;
mod sqlite_subscription_repository;

pub use sqlite_campaign_repository::SqliteCampaignRepository;
pub use sqlite_product_repository::SqliteProductRepository;
pub use sqlite_score_repository::SqliteScoreRepository;
pub use sqlite_subscription_repository::SqliteSubscriptionRepository;

/// Open (creating if missing) the SQLite database and bring the schema up.
pub async fn connect(database_url: &str) -> ScoutResult<SqlitePool> {
    debug!("Connecting to database: {}", database_url);
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .min_connections(1)
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;
    Ok(pool)
}

pub async fn run_migrations(pool: &SqlitePool) -> ScoutResult<()> {
    debug!("Running database migrations");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS products (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            search_volume INTEGER NOT NULL DEFAULT 0,
            sales_rank INTEGER NOT NULL DEFAULT 0,
            competitor_count INTEGER NOT NULL DEFAULT 0,
            shipping_cost REAL NOT NULL DEFAULT 0,
            return_rate REAL NOT NULL DEFAULT 0,
            seasonality_variation REAL NOT NULL DEFAULT 0,
            has_restrictions INTEGER NOT NULL DEFAULT 0,
            selling_price REAL NOT NULL DEFAULT 0,
            product_cost REAL NOT NULL DEFAULT 0,
            fees REAL NOT NULL DEFAULT 0,
            supplier_rating REAL NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS product_scores (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            product_id INTEGER NOT NULL,
            demand REAL NOT NULL,
            competition REAL NOT NULL,
            profit_margin REAL NOT NULL,
            supplier_reliability REAL NOT NULL,
            shipping_handling REAL NOT NULL,
            return_rate REAL NOT NULL,
            seasonality REAL NOT NULL,
            product_restrictions REAL NOT NULL,
            final_score REAL NOT NULL,
            created_at TEXT NOT NULL,
            FOREIGN KEY (product_id) REFERENCES products(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS scoring_weights (
            criterion TEXT PRIMARY KEY,
            weight REAL NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS alerts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            product_id INTEGER NOT NULL,
            condition_type TEXT NOT NULL DEFAULT 'score_above',
            threshold REAL NOT NULL DEFAULT 0,
            notification_method TEXT NOT NULL DEFAULT 'email',
            active INTEGER NOT NULL DEFAULT 1
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS campaign_products (
            campaign_id TEXT NOT NULL,
            product_id INTEGER NOT NULL,
            score REAL NOT NULL,
            created_at TEXT NOT NULL,
            UNIQUE (campaign_id, product_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
pub(crate) async fn memory_pool() -> SqlitePool {
    // Single connection, otherwise each pooled connection would get its own
    // private in-memory database.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory pool");
    run_migrations(&pool).await.expect("migrations");
    pool
}
