use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use scout_domain::{
    queues, Broker, EnqueueOptions, ScoutResult, ScrapePayload, SearchPayload, TaskHandler,
};

use crate::sources::SourceAdapter;

/// Consumes search tasks: queries every configured source and fans out one
/// scrape task per discovered listing URL.
pub struct SearchStage {
    sources: Vec<Arc<dyn SourceAdapter>>,
    broker: Arc<dyn Broker>,
}

impl SearchStage {
    pub fn new(sources: Vec<Arc<dyn SourceAdapter>>, broker: Arc<dyn Broker>) -> Self {
        Self { sources, broker }
    }
}

#[async_trait]
impl TaskHandler for SearchStage {
    async fn handle(&self, payload: serde_json::Value) -> ScoutResult<()> {
        let payload: SearchPayload = serde_json::from_value(payload)?;
        payload.params.validate()?;
        let limit = payload.params.effective_limit() as usize;

        let mut total = 0usize;
        for source in &self.sources {
            // An adapter network error fails the whole task and lets the
            // broker's retry policy take over.
            let urls = source.search(&payload.params).await?;
            let found = urls.len().min(limit);
            for url in urls.into_iter().take(limit) {
                let scrape = ScrapePayload {
                    campaign_id: payload.campaign_id,
                    url,
                };
                self.broker
                    .enqueue(
                        queues::SCRAPE,
                        serde_json::to_value(&scrape)?,
                        EnqueueOptions::default(),
                    )
                    .await?;
            }
            info!(
                "Source {}: {} listing(s) for '{}'",
                source.name(),
                found,
                payload.params.keywords
            );
            total += found;
        }

        // Zero results is a valid completion, not a failure.
        info!(
            "Search round for campaign {} enqueued {} scrape task(s)",
            payload.campaign_id, total
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::RecordingBroker;
    use scout_domain::{ScoutError, SearchParams};
    use uuid::Uuid;

    struct StubSource {
        name: String,
        urls: Vec<String>,
        fail: bool,
    }

    #[async_trait]
    impl SourceAdapter for StubSource {
        fn name(&self) -> &str {
            &self.name
        }

        async fn search(&self, _params: &SearchParams) -> ScoutResult<Vec<String>> {
            if self.fail {
                Err(ScoutError::network_error("source unreachable"))
            } else {
                Ok(self.urls.clone())
            }
        }
    }

    fn payload(limit: u32) -> serde_json::Value {
        let mut params = SearchParams::new("lamp");
        params.limit = limit;
        serde_json::to_value(SearchPayload {
            campaign_id: Uuid::new_v4(),
            params,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_fans_out_one_scrape_task_per_url_per_source() {
        let broker = RecordingBroker::new();
        let stage = SearchStage::new(
            vec![
                Arc::new(StubSource {
                    name: "a".into(),
                    urls: vec!["http://a/1".into(), "http://a/2".into()],
                    fail: false,
                }),
                Arc::new(StubSource {
                    name: "b".into(),
                    // Duplicate across sources is not deduplicated here
                    urls: vec!["http://a/1".into()],
                    fail: false,
                }),
            ],
            broker.clone(),
        );

        stage.handle(payload(10)).await.unwrap();

        let enqueued = broker.enqueued.lock().unwrap();
        assert_eq!(enqueued.len(), 3);
        assert!(enqueued.iter().all(|(q, _, _)| q == queues::SCRAPE));
    }

    #[tokio::test]
    async fn test_limit_applies_per_source() {
        let broker = RecordingBroker::new();
        let urls: Vec<String> = (0..30).map(|i| format!("http://a/{i}")).collect();
        let stage = SearchStage::new(
            vec![Arc::new(StubSource {
                name: "a".into(),
                urls,
                fail: false,
            })],
            broker.clone(),
        );

        stage.handle(payload(5)).await.unwrap();
        assert_eq!(broker.enqueued.lock().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_zero_results_completes() {
        let broker = RecordingBroker::new();
        let stage = SearchStage::new(
            vec![Arc::new(StubSource {
                name: "a".into(),
                urls: vec![],
                fail: false,
            })],
            broker.clone(),
        );
        assert!(stage.handle(payload(10)).await.is_ok());
        assert!(broker.enqueued.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_adapter_network_error_fails_task() {
        let broker = RecordingBroker::new();
        let stage = SearchStage::new(
            vec![Arc::new(StubSource {
                name: "a".into(),
                urls: vec![],
                fail: true,
            })],
            broker,
        );
        let err = stage.handle(payload(10)).await.unwrap_err();
        assert!(err.is_retryable());
    }
}
