use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc, watch, Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use scout_domain::{
    Broker, EnqueueOptions, RateLimit, ScoutError, ScoutResult, TaskHandler, TaskState,
    WorkerOptions,
};

/// Tokio-channel work queue with per-task lifecycle tracking.
///
/// Each named queue is an unbounded mpsc channel carrying task ids; the task
/// table holds payload, retry budget and a watch channel for state updates.
/// Workers registered on a queue pull from a shared receiver, so a pool of N
/// workers gives N-way concurrency within the stage.
pub struct InMemoryBroker {
    queues: Arc<RwLock<HashMap<String, QueueChannels>>>,
    tasks: Arc<RwLock<HashMap<Uuid, TaskEntry>>>,
    shutdown_tx: broadcast::Sender<()>,
    worker_handles: Arc<Mutex<Vec<tokio::task::JoinHandle<()>>>>,
}

struct QueueChannels {
    sender: mpsc::UnboundedSender<Uuid>,
    // Arc-wrapped receiver so several workers can share one queue
    receiver: Arc<Mutex<mpsc::UnboundedReceiver<Uuid>>>,
}

struct TaskEntry {
    queue: String,
    payload: serde_json::Value,
    attempt: u32,
    max_attempts: u32,
    backoff_base: Duration,
    state_tx: watch::Sender<TaskState>,
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBroker {
    pub fn new() -> Self {
        let (shutdown_tx, _) = broadcast::channel(16);
        Self {
            queues: Arc::new(RwLock::new(HashMap::new())),
            tasks: Arc::new(RwLock::new(HashMap::new())),
            shutdown_tx,
            worker_handles: Arc::new(Mutex::new(Vec::new())),
        }
    }

    async fn ensure_queue(&self, queue: &str) -> QueueHandle {
        let mut queues = self.queues.write().await;
        let channels = queues.entry(queue.to_string()).or_insert_with(|| {
            debug!("Creating queue: {}", queue);
            let (sender, receiver) = mpsc::unbounded_channel();
            QueueChannels {
                sender,
                receiver: Arc::new(Mutex::new(receiver)),
            }
        });
        QueueHandle {
            sender: channels.sender.clone(),
            receiver: channels.receiver.clone(),
        }
    }

    /// Signal all workers and wait for in-flight tasks to drain.
    pub async fn shutdown(&self) {
        info!("Shutting down broker workers");
        let _ = self.shutdown_tx.send(());
        let mut handles = self.worker_handles.lock().await;
        for handle in handles.drain(..) {
            if let Err(e) = handle.await {
                warn!("Worker task ended abnormally: {}", e);
            }
        }
    }
}

#[derive(Clone)]
struct QueueHandle {
    sender: mpsc::UnboundedSender<Uuid>,
    receiver: Arc<Mutex<mpsc::UnboundedReceiver<Uuid>>>,
}

#[async_trait]
impl Broker for InMemoryBroker {
    async fn enqueue(
        &self,
        queue: &str,
        payload: serde_json::Value,
        options: EnqueueOptions,
    ) -> ScoutResult<Uuid> {
        if queue.is_empty() {
            return Err(ScoutError::queue_error("queue name must not be empty"));
        }
        let task_id = Uuid::new_v4();
        let (state_tx, _) = watch::channel(TaskState::Queued);
        let entry = TaskEntry {
            queue: queue.to_string(),
            payload,
            attempt: 1,
            max_attempts: options.max_attempts.max(1),
            backoff_base: options.backoff_base,
            state_tx,
        };

        let handle = self.ensure_queue(queue).await;
        self.tasks.write().await.insert(task_id, entry);
        handle
            .sender
            .send(task_id)
            .map_err(|e| ScoutError::queue_error(format!("enqueue to {queue} failed: {e}")))?;
        debug!("Enqueued task {} on queue {}", task_id, queue);
        Ok(task_id)
    }

    async fn state(&self, task_id: Uuid) -> ScoutResult<TaskState> {
        let tasks = self.tasks.read().await;
        let entry = tasks
            .get(&task_id)
            .ok_or(ScoutError::TaskNotFound { id: task_id })?;
        let state = *entry.state_tx.borrow();
        Ok(state)
    }

    async fn subscribe(&self, task_id: Uuid) -> ScoutResult<watch::Receiver<TaskState>> {
        let tasks = self.tasks.read().await;
        let entry = tasks
            .get(&task_id)
            .ok_or(ScoutError::TaskNotFound { id: task_id })?;
        Ok(entry.state_tx.subscribe())
    }

    async fn register_worker(
        &self,
        queue: &str,
        handler: Arc<dyn TaskHandler>,
        options: WorkerOptions,
    ) -> ScoutResult<()> {
        let handle = self.ensure_queue(queue).await;
        let rate_limiter = options
            .rate_limit
            .map(|limit| Arc::new(SlidingWindowLimiter::new(limit)));
        let concurrency = options.concurrency.max(1);
        info!(
            "Registering {} worker(s) on queue {} (rate limit: {:?})",
            concurrency, queue, options.rate_limit
        );

        let mut handles = self.worker_handles.lock().await;
        for worker_index in 0..concurrency {
            let handle = handle.clone();
            let handler = handler.clone();
            let tasks = self.tasks.clone();
            let rate_limiter = rate_limiter.clone();
            let mut shutdown_rx = self.shutdown_tx.subscribe();
            let queue = queue.to_string();

            handles.push(tokio::spawn(async move {
                debug!("Worker {}#{} started", queue, worker_index);
                loop {
                    let task_id = {
                        let mut receiver = handle.receiver.lock().await;
                        tokio::select! {
                            _ = shutdown_rx.recv() => break,
                            next = receiver.recv() => match next {
                                Some(id) => id,
                                None => break,
                            },
                        }
                    };

                    if let Some(limiter) = &rate_limiter {
                        limiter.acquire().await;
                    }

                    run_task(&queue, task_id, &handler, &tasks, &handle.sender).await;
                }
                debug!("Worker {}#{} stopped", queue, worker_index);
            }));
        }
        Ok(())
    }
}

/// Execute one delivery of a task and apply the retry policy on failure.
async fn run_task(
    queue: &str,
    task_id: Uuid,
    handler: &Arc<dyn TaskHandler>,
    tasks: &Arc<RwLock<HashMap<Uuid, TaskEntry>>>,
    sender: &mpsc::UnboundedSender<Uuid>,
) {
    let (payload, attempt, max_attempts, backoff_base) = {
        let tasks = tasks.read().await;
        let Some(entry) = tasks.get(&task_id) else {
            warn!("Task {} vanished from task table, skipping", task_id);
            return;
        };
        entry.state_tx.send_replace(TaskState::Active);
        (
            entry.payload.clone(),
            entry.attempt,
            entry.max_attempts,
            entry.backoff_base,
        )
    };

    match handler.handle(payload).await {
        Ok(()) => {
            let tasks = tasks.read().await;
            if let Some(entry) = tasks.get(&task_id) {
                entry.state_tx.send_replace(TaskState::Completed);
            }
            debug!("Task {} on {} completed (attempt {})", task_id, queue, attempt);
        }
        Err(err) if err.is_retryable() && attempt < max_attempts => {
            // Exponential backoff: base * 2^(attempt-1)
            let delay = backoff_base * 2u32.saturating_pow(attempt - 1);
            warn!(
                "Task {} on {} failed (attempt {}/{}), retrying in {:?}: {}",
                task_id, queue, attempt, max_attempts, delay, err
            );
            {
                let mut tasks = tasks.write().await;
                if let Some(entry) = tasks.get_mut(&task_id) {
                    entry.attempt += 1;
                    entry.state_tx.send_replace(TaskState::Queued);
                }
            }
            let sender = sender.clone();
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                // Broker may be gone by now; nothing left to deliver to.
                let _ = sender.send(task_id);
            });
        }
        Err(err) => {
            error!(
                "Task {} on {} failed terminally (attempt {}/{}): {}",
                task_id, queue, attempt, max_attempts, err
            );
            let tasks = tasks.read().await;
            if let Some(entry) = tasks.get(&task_id) {
                entry.state_tx.send_replace(TaskState::Failed);
            }
        }
    }
}

/// Sliding-window admission control: at most `max_starts` task starts per
/// `window`. Waiters sleep until the oldest start ages out.
struct SlidingWindowLimiter {
    limit: RateLimit,
    starts: Mutex<VecDeque<Instant>>,
}

impl SlidingWindowLimiter {
    fn new(limit: RateLimit) -> Self {
        Self {
            limit,
            starts: Mutex::new(VecDeque::new()),
        }
    }

    async fn acquire(&self) {
        loop {
            let wait_until = {
                let mut starts = self.starts.lock().await;
                let now = Instant::now();
                while let Some(&front) = starts.front() {
                    if now.duration_since(front) >= self.limit.window {
                        starts.pop_front();
                    } else {
                        break;
                    }
                }
                if (starts.len() as u32) < self.limit.max_starts {
                    starts.push_back(now);
                    return;
                }
                // Earliest start plus one window is the next free slot.
                match starts.front() {
                    Some(&front) => front + self.limit.window,
                    // A zero-start limit admits nothing; park for a window.
                    None => Instant::now() + self.limit.window,
                }
            };
            tokio::time::sleep_until(wait_until).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct CountingHandler {
        calls: AtomicU32,
        fail_first: u32,
        retryable: bool,
    }

    impl CountingHandler {
        fn succeeding() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicU32::new(0),
                fail_first: 0,
                retryable: true,
            })
        }

        fn failing_first(n: u32, retryable: bool) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicU32::new(0),
                fail_first: n,
                retryable,
            })
        }
    }

    #[async_trait]
    impl TaskHandler for CountingHandler {
        async fn handle(&self, _payload: serde_json::Value) -> ScoutResult<()> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call <= self.fail_first {
                if self.retryable {
                    Err(ScoutError::network_error("simulated outage"))
                } else {
                    Err(ScoutError::validation_error("bad payload"))
                }
            } else {
                Ok(())
            }
        }
    }

    async fn wait_terminal(broker: &InMemoryBroker, task_id: Uuid) -> TaskState {
        let mut rx = broker.subscribe(task_id).await.unwrap();
        loop {
            let state = *rx.borrow();
            if state.is_terminal() {
                return state;
            }
            tokio::time::timeout(Duration::from_secs(5), rx.changed())
                .await
                .expect("task did not reach a terminal state")
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_task_completes_and_state_transitions() {
        let broker = InMemoryBroker::new();
        let handler = CountingHandler::succeeding();
        broker
            .register_worker("q", handler.clone(), WorkerOptions::concurrency(1))
            .await
            .unwrap();

        let id = broker
            .enqueue("q", serde_json::json!({"n": 1}), EnqueueOptions::default())
            .await
            .unwrap();

        assert_eq!(wait_terminal(&broker, id).await, TaskState::Completed);
        assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
        assert_eq!(broker.state(id).await.unwrap(), TaskState::Completed);
    }

    #[tokio::test]
    async fn test_retryable_failure_is_retried_until_success() {
        let broker = InMemoryBroker::new();
        let handler = CountingHandler::failing_first(2, true);
        broker
            .register_worker("q", handler.clone(), WorkerOptions::concurrency(1))
            .await
            .unwrap();

        let id = broker
            .enqueue(
                "q",
                serde_json::json!({}),
                EnqueueOptions::with_retries(3, Duration::from_millis(5)),
            )
            .await
            .unwrap();

        assert_eq!(wait_terminal(&broker, id).await, TaskState::Completed);
        assert_eq!(handler.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_budget_exhaustion_fails_task() {
        let broker = InMemoryBroker::new();
        let handler = CountingHandler::failing_first(10, true);
        broker
            .register_worker("q", handler.clone(), WorkerOptions::concurrency(1))
            .await
            .unwrap();

        let id = broker
            .enqueue(
                "q",
                serde_json::json!({}),
                EnqueueOptions::with_retries(3, Duration::from_millis(5)),
            )
            .await
            .unwrap();

        assert_eq!(wait_terminal(&broker, id).await, TaskState::Failed);
        assert_eq!(handler.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_failure_is_terminal_immediately() {
        let broker = InMemoryBroker::new();
        let handler = CountingHandler::failing_first(10, false);
        broker
            .register_worker("q", handler.clone(), WorkerOptions::concurrency(1))
            .await
            .unwrap();

        let id = broker
            .enqueue(
                "q",
                serde_json::json!({}),
                EnqueueOptions::with_retries(3, Duration::from_millis(5)),
            )
            .await
            .unwrap();

        assert_eq!(wait_terminal(&broker, id).await, TaskState::Failed);
        assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unknown_task_id() {
        let broker = InMemoryBroker::new();
        assert!(matches!(
            broker.state(Uuid::new_v4()).await,
            Err(ScoutError::TaskNotFound { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_delays_admission() {
        let limiter = SlidingWindowLimiter::new(RateLimit {
            max_starts: 2,
            window: Duration::from_secs(60),
        });

        let start = Instant::now();
        limiter.acquire().await;
        limiter.acquire().await;
        assert_eq!(start.elapsed(), Duration::ZERO);

        // Third start must wait for the window to roll over.
        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_concurrent_workers_drain_queue() {
        let broker = InMemoryBroker::new();
        let handler = CountingHandler::succeeding();
        broker
            .register_worker("q", handler.clone(), WorkerOptions::concurrency(5))
            .await
            .unwrap();

        let mut ids = Vec::new();
        for i in 0..20 {
            ids.push(
                broker
                    .enqueue("q", serde_json::json!({ "i": i }), EnqueueOptions::default())
                    .await
                    .unwrap(),
            );
        }
        for id in ids {
            assert_eq!(wait_terminal(&broker, id).await, TaskState::Completed);
        }
        assert_eq!(handler.calls.load(Ordering::SeqCst), 20);
    }
}
