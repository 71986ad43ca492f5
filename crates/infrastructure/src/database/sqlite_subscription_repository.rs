use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use tracing::warn;

use scout_domain::{NotificationMethod, ScoutResult, Subscription, SubscriptionRepository};

pub struct SqliteSubscriptionRepository {
    pool: SqlitePool,
}

impl SqliteSubscriptionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Test/seeding helper for the alert-rule rows the CRUD layer owns.
    pub async fn insert(
        &self,
        user_id: i64,
        product_id: i64,
        threshold: f64,
        method: NotificationMethod,
        active: bool,
    ) -> ScoutResult<i64> {
        let row = sqlx::query(
            r#"
            INSERT INTO alerts (user_id, product_id, condition_type, threshold, notification_method, active)
            VALUES (?1, ?2, 'score_above', ?3, ?4, ?5)
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(product_id)
        .bind(threshold)
        .bind(method.as_str())
        .bind(active)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.try_get("id")?)
    }
}

#[async_trait]
impl SubscriptionRepository for SqliteSubscriptionRepository {
    async fn active_for_product(&self, product_id: i64) -> ScoutResult<Vec<Subscription>> {
        let rows = sqlx::query("SELECT * FROM alerts WHERE product_id = ?1 AND active = 1")
            .bind(product_id)
            .fetch_all(&self.pool)
            .await?;

        let mut subscriptions = Vec::with_capacity(rows.len());
        for row in rows {
            let method_raw: String = row.try_get("notification_method")?;
            let notification_method = match NotificationMethod::parse(&method_raw) {
                Ok(m) => m,
                Err(_) => {
                    warn!(
                        "Skipping alert rule {} with unknown notification method {}",
                        row.try_get::<i64, _>("id")?,
                        method_raw
                    );
                    continue;
                }
            };
            subscriptions.push(Subscription {
                id: row.try_get("id")?,
                user_id: row.try_get("user_id")?,
                product_id: row.try_get("product_id")?,
                condition_type: row.try_get("condition_type")?,
                threshold: row.try_get("threshold")?,
                notification_method,
                active: row.try_get("active")?,
            });
        }
        Ok(subscriptions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory_pool;

    #[tokio::test]
    async fn test_only_active_matching_rules_returned() {
        let repo = SqliteSubscriptionRepository::new(memory_pool().await);

        repo.insert(1, 10, 0.6, NotificationMethod::Email, true)
            .await
            .unwrap();
        repo.insert(2, 10, 0.8, NotificationMethod::Sms, false)
            .await
            .unwrap();
        repo.insert(3, 11, 0.5, NotificationMethod::Push, true)
            .await
            .unwrap();

        let subs = repo.active_for_product(10).await.unwrap();
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].user_id, 1);
        assert_eq!(subs[0].notification_method, NotificationMethod::Email);
    }

    #[tokio::test]
    async fn test_no_rules_is_empty() {
        let repo = SqliteSubscriptionRepository::new(memory_pool().await);
        assert!(repo.active_for_product(99).await.unwrap().is_empty());
    }
}
