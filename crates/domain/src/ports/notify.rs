use async_trait::async_trait;

use crate::models::product::Product;
use crate::models::subscription::Subscription;
use crate::ScoutResult;

/// Channel dispatch for alert notifications. One call per subscription; a
/// failure for one subscriber must not block the others.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send(
        &self,
        subscription: &Subscription,
        product: &Product,
        score: f64,
    ) -> ScoutResult<()>;
}
