use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{error, info, warn};
use uuid::Uuid;

use scout_domain::{
    queues, Broker, CampaignOutcome, CampaignRepository, CampaignStatus, EnqueueOptions,
    ScoutError, ScoutResult, SearchParams, SearchPayload, TaskState,
};

/// Wait-step settings for the coordinator's `Waiting` state.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    pub poll_interval: Duration,
    pub max_poll_attempts: u32,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            max_poll_attempts: 10,
        }
    }
}

/// Drives repeated search rounds until a campaign collects its target count
/// of qualifying products or runs out of iterations.
///
/// One logical control loop per campaign; campaigns share the broker and
/// store, and the qualifying set is scoped by campaign id.
pub struct Coordinator {
    broker: Arc<dyn Broker>,
    campaigns: Arc<dyn CampaignRepository>,
    config: CoordinatorConfig,
}

/// Live handle to a running campaign.
pub struct CampaignHandle {
    id: Uuid,
    status_rx: watch::Receiver<CampaignStatus>,
    cancel_tx: watch::Sender<bool>,
    join: tokio::task::JoinHandle<CampaignOutcome>,
}

impl CampaignHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn status(&self) -> CampaignStatus {
        *self.status_rx.borrow()
    }

    /// Stop further search rounds; in-flight tasks drain on their own.
    pub fn cancel(&self) {
        let _ = self.cancel_tx.send(true);
    }

    /// Cancel the campaign when the shutdown signal fires.
    pub fn cancel_on_shutdown(&self, mut shutdown_rx: tokio::sync::broadcast::Receiver<()>) {
        let cancel_tx = self.cancel_tx.clone();
        tokio::spawn(async move {
            let _ = shutdown_rx.recv().await;
            let _ = cancel_tx.send(true);
        });
    }

    pub async fn wait(self) -> ScoutResult<CampaignOutcome> {
        self.join
            .await
            .map_err(|e| ScoutError::Internal(format!("campaign task panicked: {e}")))
    }
}

impl Coordinator {
    pub fn new(
        broker: Arc<dyn Broker>,
        campaigns: Arc<dyn CampaignRepository>,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            broker,
            campaigns,
            config,
        }
    }

    /// Enqueue a single search round outside any campaign loop.
    pub async fn initiate_product_search(&self, params: SearchParams) -> ScoutResult<Uuid> {
        params.validate()?;
        let payload = SearchPayload {
            campaign_id: Uuid::new_v4(),
            params,
        };
        let task_id = self
            .broker
            .enqueue(
                queues::SEARCH,
                serde_json::to_value(&payload)?,
                EnqueueOptions::default(),
            )
            .await?;
        info!("Enqueued one-shot product search task {}", task_id);
        Ok(task_id)
    }

    /// Start the campaign control loop and return a handle to it.
    pub fn start_campaign(
        &self,
        params: SearchParams,
        target_count: u64,
        max_iterations: u32,
    ) -> CampaignHandle {
        let campaign_id = Uuid::new_v4();
        let (status_tx, status_rx) = watch::channel(CampaignStatus::Idle);
        let (cancel_tx, cancel_rx) = watch::channel(false);

        let runner = CampaignRunner {
            broker: self.broker.clone(),
            campaigns: self.campaigns.clone(),
            config: self.config.clone(),
            campaign_id,
            params,
            target_count,
            max_iterations,
            status_tx,
            cancel_rx,
        };
        info!(
            "Starting campaign {} (target {}, max {} iterations)",
            campaign_id, target_count, max_iterations
        );
        let join = tokio::spawn(runner.run());

        CampaignHandle {
            id: campaign_id,
            status_rx,
            cancel_tx,
            join,
        }
    }
}

struct CampaignRunner {
    broker: Arc<dyn Broker>,
    campaigns: Arc<dyn CampaignRepository>,
    config: CoordinatorConfig,
    campaign_id: Uuid,
    params: SearchParams,
    target_count: u64,
    max_iterations: u32,
    status_tx: watch::Sender<CampaignStatus>,
    cancel_rx: watch::Receiver<bool>,
}

impl CampaignRunner {
    fn set_status(&self, status: CampaignStatus) {
        let _ = self.status_tx.send(status);
    }

    async fn run(self) -> CampaignOutcome {
        let mut iterations = 0u32;
        let mut collected = 0u64;

        let status = loop {
            match self.campaigns.qualifying_count(self.campaign_id).await {
                Ok(count) => collected = count,
                Err(err) => {
                    error!(
                        "Campaign {}: qualifying-set read failed: {}",
                        self.campaign_id, err
                    );
                    break CampaignStatus::Aborted;
                }
            }
            info!(
                "Campaign {}: collected {}/{} qualifying products",
                self.campaign_id, collected, self.target_count
            );

            if collected >= self.target_count {
                break CampaignStatus::Done;
            }
            if iterations >= self.max_iterations {
                warn!(
                    "Campaign {}: reached max iterations ({}) with {}/{} products",
                    self.campaign_id, self.max_iterations, collected, self.target_count
                );
                break CampaignStatus::Aborted;
            }
            if *self.cancel_rx.borrow() {
                info!("Campaign {} cancelled", self.campaign_id);
                break CampaignStatus::Aborted;
            }

            iterations += 1;
            self.set_status(CampaignStatus::Searching);
            let payload = SearchPayload {
                campaign_id: self.campaign_id,
                params: self.params.clone(),
            };
            let task_id = match self.enqueue_search(&payload).await {
                Ok(id) => id,
                Err(err) => {
                    error!("Campaign {}: enqueue failed: {}", self.campaign_id, err);
                    break CampaignStatus::Aborted;
                }
            };

            self.set_status(CampaignStatus::Waiting);
            match self.wait_for_terminal(task_id).await {
                Ok(TaskState::Completed) => {
                    info!(
                        "Campaign {}: iteration {} search task {} completed",
                        self.campaign_id, iterations, task_id
                    );
                }
                Ok(state) => {
                    // A failed search round aborts the whole campaign.
                    error!(
                        "Campaign {}: search task {} ended {:?}, aborting",
                        self.campaign_id, task_id, state
                    );
                    break CampaignStatus::Aborted;
                }
                Err(err) => {
                    error!(
                        "Campaign {}: wait for task {} failed: {}",
                        self.campaign_id, task_id, err
                    );
                    break CampaignStatus::Aborted;
                }
            }
            self.set_status(CampaignStatus::Evaluating);
        };

        self.set_status(status);
        if status == CampaignStatus::Done {
            info!(
                "Campaign {} done: {}/{} after {} iteration(s)",
                self.campaign_id, collected, self.target_count, iterations
            );
        }
        CampaignOutcome {
            campaign_id: self.campaign_id,
            status,
            collected,
            iterations,
        }
    }

    async fn enqueue_search(&self, payload: &SearchPayload) -> ScoutResult<Uuid> {
        self.broker
            .enqueue(
                queues::SEARCH,
                serde_json::to_value(payload)?,
                EnqueueOptions::default(),
            )
            .await
    }

    /// Event-driven wait with the polling contract kept observable: at most
    /// `max_poll_attempts` interval timeouts before the step gives up.
    async fn wait_for_terminal(&self, task_id: Uuid) -> ScoutResult<TaskState> {
        let mut state_rx = self.broker.subscribe(task_id).await?;
        let mut attempts = 0u32;
        loop {
            let state = *state_rx.borrow();
            if state.is_terminal() {
                return Ok(state);
            }
            if attempts >= self.config.max_poll_attempts {
                return Err(ScoutError::Timeout(format!(
                    "search task {task_id} not finished after {attempts} poll intervals"
                )));
            }
            match tokio::time::timeout(self.config.poll_interval, state_rx.changed()).await {
                // State moved; re-check without consuming an attempt.
                Ok(Ok(())) => {}
                Ok(Err(_)) => {
                    return Err(ScoutError::queue_error(format!(
                        "state channel for task {task_id} closed"
                    )))
                }
                Err(_) => attempts += 1,
            }
        }
    }
}
