use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

use scout_domain::{NotificationSender, Product, ScoutError, ScoutResult, Subscription};

/// Sink that records notifications in the log. Default channel when no
/// delivery endpoint is configured.
pub struct LogNotifier;

#[async_trait]
impl NotificationSender for LogNotifier {
    async fn send(
        &self,
        subscription: &Subscription,
        product: &Product,
        score: f64,
    ) -> ScoutResult<()> {
        info!(
            "Notify user {} via {}: product '{}' (id {}) scored {:.3}",
            subscription.user_id,
            subscription.notification_method.as_str(),
            product.name,
            product.id,
            score
        );
        Ok(())
    }
}

#[derive(Serialize)]
struct NotificationBody<'a> {
    user_id: i64,
    method: &'a str,
    product_id: i64,
    product_name: &'a str,
    score: f64,
}

/// Posts one JSON notification per subscriber to a delivery endpoint
/// (mail relay, SMS gateway bridge, etc.).
pub struct WebhookNotifier {
    client: reqwest::Client,
    endpoint: String,
}

impl WebhookNotifier {
    pub fn new(client: reqwest::Client, endpoint: String) -> Self {
        Self { client, endpoint }
    }
}

#[async_trait]
impl NotificationSender for WebhookNotifier {
    async fn send(
        &self,
        subscription: &Subscription,
        product: &Product,
        score: f64,
    ) -> ScoutResult<()> {
        let body = NotificationBody {
            user_id: subscription.user_id,
            method: subscription.notification_method.as_str(),
            product_id: product.id,
            product_name: &product.name,
            score,
        };
        self.client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ScoutError::Notification(format!("webhook {}: {e}", self.endpoint)))?;
        Ok(())
    }
}
