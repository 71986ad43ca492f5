use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use scout_domain::{
    AlertPayload, NotificationSender, ProductRepository, ScoutResult, SubscriptionRepository,
    TaskHandler,
};

/// Per-task delivery report: one entry per active subscription.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliverySummary {
    pub delivered: usize,
    pub failed: usize,
}

/// Consumes alert tasks: notifies every subscriber watching the product.
pub struct AlertStage {
    products: Arc<dyn ProductRepository>,
    subscriptions: Arc<dyn SubscriptionRepository>,
    sender: Arc<dyn NotificationSender>,
}

impl AlertStage {
    pub fn new(
        products: Arc<dyn ProductRepository>,
        subscriptions: Arc<dyn SubscriptionRepository>,
        sender: Arc<dyn NotificationSender>,
    ) -> Self {
        Self {
            products,
            subscriptions,
            sender,
        }
    }

    /// Dispatch to all active subscribers. A failure for one subscriber is
    /// recorded and never blocks the rest; the task itself only fails when
    /// the subscription list cannot be loaded.
    pub async fn dispatch(&self, payload: &AlertPayload) -> ScoutResult<DeliverySummary> {
        let subscriptions = self
            .subscriptions
            .active_for_product(payload.product_id)
            .await?;
        if subscriptions.is_empty() {
            debug!("No active subscriptions for product {}", payload.product_id);
            return Ok(DeliverySummary::default());
        }

        let Some(product) = self.products.get_by_id(payload.product_id).await? else {
            warn!(
                "Product {} not found for alerting, skipping",
                payload.product_id
            );
            return Ok(DeliverySummary::default());
        };

        let mut summary = DeliverySummary::default();
        for subscription in &subscriptions {
            match self
                .sender
                .send(subscription, &product, payload.score)
                .await
            {
                Ok(()) => summary.delivered += 1,
                Err(err) => {
                    summary.failed += 1;
                    warn!(
                        "Notification to user {} via {} failed: {}",
                        subscription.user_id,
                        subscription.notification_method.as_str(),
                        err
                    );
                }
            }
        }
        info!(
            "Alert for product {}: {} delivered, {} failed",
            payload.product_id, summary.delivered, summary.failed
        );
        Ok(summary)
    }
}

#[async_trait]
impl TaskHandler for AlertStage {
    async fn handle(&self, payload: serde_json::Value) -> ScoutResult<()> {
        let payload: AlertPayload = serde_json::from_value(payload)?;
        self.dispatch(&payload).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{
        product_fixture, FakeProductRepo, FakeSender, FakeSubscriptionRepo,
    };
    use scout_domain::{NotificationMethod, Subscription};

    fn subscription(id: i64, user_id: i64, product_id: i64, active: bool) -> Subscription {
        Subscription {
            id,
            user_id,
            product_id,
            condition_type: "score_above".to_string(),
            threshold: 0.6,
            notification_method: NotificationMethod::Email,
            active,
        }
    }

    #[tokio::test]
    async fn test_notifies_each_active_subscriber() {
        let products = FakeProductRepo::with_product(product_fixture(5, "Lamp"));
        let subs = FakeSubscriptionRepo::with(vec![
            subscription(1, 10, 5, true),
            subscription(2, 11, 5, true),
            subscription(3, 12, 5, false),
            subscription(4, 13, 6, true),
        ]);
        let sender = FakeSender::new();
        let stage = AlertStage::new(products, subs, sender.clone());

        let summary = stage
            .dispatch(&AlertPayload {
                product_id: 5,
                score: 0.8,
            })
            .await
            .unwrap();

        assert_eq!(summary, DeliverySummary { delivered: 2, failed: 0 });
        let sent = sender.sent.lock().unwrap();
        assert_eq!(sent.as_slice(), &[(10, 0.8), (11, 0.8)]);
    }

    #[tokio::test]
    async fn test_one_failure_does_not_block_others() {
        let products = FakeProductRepo::with_product(product_fixture(5, "Lamp"));
        let subs = FakeSubscriptionRepo::with(vec![
            subscription(1, 10, 5, true),
            subscription(2, 11, 5, true),
            subscription(3, 12, 5, true),
        ]);
        let sender = FakeSender::failing_for(vec![11]);
        let stage = AlertStage::new(products, subs, sender.clone());

        let summary = stage
            .dispatch(&AlertPayload {
                product_id: 5,
                score: 0.7,
            })
            .await
            .unwrap();

        assert_eq!(summary, DeliverySummary { delivered: 2, failed: 1 });
        assert_eq!(sender.sent.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_subscription_load_failure_fails_task() {
        let products = FakeProductRepo::with_product(product_fixture(5, "Lamp"));
        let stage = AlertStage::new(products, FakeSubscriptionRepo::failing(), FakeSender::new());

        let err = stage
            .handle(serde_json::to_value(AlertPayload { product_id: 5, score: 0.7 }).unwrap())
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_missing_product_skips() {
        let products = FakeProductRepo::new();
        let subs = FakeSubscriptionRepo::with(vec![subscription(1, 10, 5, true)]);
        let sender = FakeSender::new();
        let stage = AlertStage::new(products, subs, sender.clone());

        let summary = stage
            .dispatch(&AlertPayload {
                product_id: 5,
                score: 0.7,
            })
            .await
            .unwrap();
        assert_eq!(summary, DeliverySummary::default());
        assert!(sender.sent.lock().unwrap().is_empty());
    }
}
