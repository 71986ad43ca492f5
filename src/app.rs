use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::broadcast;
use tracing::{info, warn};
use uuid::Uuid;

use scout_coordinator::{Coordinator, CoordinatorConfig};
use scout_domain::{
    queues, Broker, CampaignOutcome, NotificationSender, RateLimit, SearchParams, WorkerOptions,
};
use scout_infrastructure::{
    connect, HttpPageFetcher, InMemoryBroker, LogNotifier, SqliteCampaignRepository,
    SqliteProductRepository, SqliteScoreRepository, SqliteSubscriptionRepository, WebhookNotifier,
};
use scout_pipeline::{
    AlertStage, ExtractionRules, HtmlSource, ScoreStage, ScrapeStage, SearchStage, SourceAdapter,
};

use crate::config::AppConfig;

/// Fully wired pipeline: storage, broker, the four stage workers and the
/// campaign coordinator.
pub struct Application {
    config: AppConfig,
    broker: Arc<InMemoryBroker>,
    coordinator: Coordinator,
}

impl Application {
    pub async fn new(config: AppConfig) -> Result<Self> {
        info!("Connecting to database {}", config.database.url);
        let pool = connect(&config.database.url)
            .await
            .context("database connection failed")?;

        let products = Arc::new(SqliteProductRepository::new(pool.clone()));
        let scores = Arc::new(SqliteScoreRepository::new(pool.clone()));
        let subscriptions = Arc::new(SqliteSubscriptionRepository::new(pool.clone()));
        let campaigns = Arc::new(SqliteCampaignRepository::new(pool.clone()));

        let fetcher = Arc::new(
            HttpPageFetcher::new(Duration::from_secs(config.workers.fetch_timeout_seconds))
                .context("failed to build HTTP client")?,
        );

        let sender: Arc<dyn NotificationSender> = match &config.notifications.webhook_url {
            Some(url) => Arc::new(WebhookNotifier::new(reqwest::Client::new(), url.clone())),
            None => Arc::new(LogNotifier),
        };

        let broker = Arc::new(InMemoryBroker::new());

        if config.sources.is_empty() {
            warn!("No sources configured; search tasks will collect nothing");
        }
        let sources: Vec<Arc<dyn SourceAdapter>> = config
            .sources
            .iter()
            .map(|definition| {
                Arc::new(HtmlSource::new(definition.clone(), fetcher.clone()))
                    as Arc<dyn SourceAdapter>
            })
            .collect();

        let search_stage = Arc::new(SearchStage::new(sources, broker.clone()));
        let scrape_stage = Arc::new(ScrapeStage::new(
            fetcher,
            products.clone(),
            broker.clone(),
            ExtractionRules::default(),
        ));
        let score_stage = Arc::new(ScoreStage::new(
            products.clone(),
            scores,
            campaigns.clone(),
            broker.clone(),
            config.scoring.threshold,
        ));
        let alert_stage = Arc::new(AlertStage::new(products, subscriptions, sender));

        broker
            .register_worker(
                queues::SEARCH,
                search_stage,
                WorkerOptions::concurrency(config.workers.search_concurrency),
            )
            .await?;
        broker
            .register_worker(
                queues::SCRAPE,
                scrape_stage,
                WorkerOptions {
                    concurrency: config.workers.scrape_concurrency,
                    rate_limit: Some(RateLimit {
                        max_starts: config.workers.scrape_rate_limit,
                        window: Duration::from_secs(config.workers.scrape_rate_window_seconds),
                    }),
                },
            )
            .await?;
        broker
            .register_worker(
                queues::SCORE,
                score_stage,
                WorkerOptions::concurrency(config.workers.score_concurrency),
            )
            .await?;
        broker
            .register_worker(
                queues::ALERT,
                alert_stage,
                WorkerOptions::concurrency(config.workers.alert_concurrency),
            )
            .await?;

        let coordinator = Coordinator::new(
            broker.clone(),
            campaigns,
            CoordinatorConfig {
                poll_interval: Duration::from_millis(config.coordinator.poll_interval_ms),
                max_poll_attempts: config.coordinator.max_poll_attempts,
            },
        );

        Ok(Self {
            config,
            broker,
            coordinator,
        })
    }

    /// Keep workers running until the shutdown signal, then drain them.
    pub async fn serve(&self, mut shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        info!("Pipeline workers running; waiting for shutdown signal");
        let _ = shutdown_rx.recv().await;
        self.broker.shutdown().await;
        info!("Pipeline workers stopped");
        Ok(())
    }

    /// Run one campaign to a terminal state, then drain the workers.
    pub async fn run_campaign(
        &self,
        params: SearchParams,
        shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<CampaignOutcome> {
        let handle = self.coordinator.start_campaign(
            params,
            self.config.coordinator.target_count,
            self.config.coordinator.max_iterations,
        );
        handle.cancel_on_shutdown(shutdown_rx);

        let outcome = handle.wait().await?;
        self.broker.shutdown().await;
        Ok(outcome)
    }

    /// Enqueue a single search round and let the pipeline drain it.
    pub async fn run_search(
        &self,
        params: SearchParams,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<Uuid> {
        let task_id = self.coordinator.initiate_product_search(params).await?;
        let mut state_rx = self.broker.subscribe(task_id).await?;

        loop {
            if state_rx.borrow().is_terminal() {
                break;
            }
            tokio::select! {
                changed = state_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = shutdown_rx.recv() => break,
            }
        }
        info!(
            "Search task {} finished as {:?}",
            task_id,
            *state_rx.borrow()
        );

        // Give downstream scrape/score/alert tasks a moment to settle before
        // draining. They are fire-and-forget from the search round's view.
        tokio::time::sleep(Duration::from_secs(2)).await;
        self.broker.shutdown().await;
        Ok(task_id)
    }
}
