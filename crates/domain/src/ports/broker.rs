use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use uuid::Uuid;

use crate::models::task::{EnqueueOptions, TaskState};
use crate::ScoutResult;

/// Stage-side task processor. The broker invokes it once per delivery; an
/// error return is eligible for retry when the error classifies as retryable
/// and the task still has attempt budget.
#[async_trait]
pub trait TaskHandler: Send + Sync {
    async fn handle(&self, payload: serde_json::Value) -> ScoutResult<()>;
}

/// Admission-control limit: at most `max_starts` tasks started per `window`.
/// Backpressure, not an error; workers wait for a slot.
#[derive(Debug, Clone, Copy)]
pub struct RateLimit {
    pub max_starts: u32,
    pub window: Duration,
}

#[derive(Debug, Clone)]
pub struct WorkerOptions {
    pub concurrency: usize,
    pub rate_limit: Option<RateLimit>,
}

impl Default for WorkerOptions {
    fn default() -> Self {
        Self {
            concurrency: 1,
            rate_limit: None,
        }
    }
}

impl WorkerOptions {
    pub fn concurrency(concurrency: usize) -> Self {
        Self {
            concurrency,
            rate_limit: None,
        }
    }
}

/// Interface to the shared work queue. Passed explicitly to every stage so
/// each can be exercised in isolation against a fake.
#[async_trait]
pub trait Broker: Send + Sync {
    /// Enqueue a payload onto a named queue; returns the task id.
    async fn enqueue(
        &self,
        queue: &str,
        payload: serde_json::Value,
        options: EnqueueOptions,
    ) -> ScoutResult<Uuid>;

    /// Current lifecycle state of a task.
    async fn state(&self, task_id: Uuid) -> ScoutResult<TaskState>;

    /// Completion-event channel for a task, so waiters never busy-spin.
    async fn subscribe(&self, task_id: Uuid) -> ScoutResult<watch::Receiver<TaskState>>;

    /// Register a worker pool consuming a queue with the given handler.
    async fn register_worker(
        &self,
        queue: &str,
        handler: Arc<dyn TaskHandler>,
        options: WorkerOptions,
    ) -> ScoutResult<()>;
}
