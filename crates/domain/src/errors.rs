use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug, Clone)]
pub enum ScoutError {
    #[error("database operation failed: {0}")]
    Database(String),
    #[error("product not found: id={id}")]
    ProductNotFound { id: i64 },
    #[error("task not found: id={id}")]
    TaskNotFound { id: Uuid },
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("network request failed: {0}")]
    Network(String),
    #[error("operation timed out: {0}")]
    Timeout(String),
    #[error("message queue operation failed: {0}")]
    MessageQueue(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("notification dispatch failed: {0}")]
    Notification(String),
    #[error("internal error: {0}")]
    Internal(String),
}

pub type ScoutResult<T> = Result<T, ScoutError>;

impl ScoutError {
    pub fn database_error<S: Into<String>>(msg: S) -> Self {
        Self::Database(msg.into())
    }
    pub fn product_not_found(id: i64) -> Self {
        Self::ProductNotFound { id }
    }
    pub fn task_not_found(id: Uuid) -> Self {
        Self::TaskNotFound { id }
    }
    pub fn validation_error<S: Into<String>>(msg: S) -> Self {
        Self::Validation(msg.into())
    }
    pub fn network_error<S: Into<String>>(msg: S) -> Self {
        Self::Network(msg.into())
    }
    pub fn queue_error<S: Into<String>>(msg: S) -> Self {
        Self::MessageQueue(msg.into())
    }
    pub fn config_error<S: Into<String>>(msg: S) -> Self {
        Self::Configuration(msg.into())
    }

    /// Whether the broker should re-deliver a task that failed with this error.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ScoutError::Database(_)
                | ScoutError::MessageQueue(_)
                | ScoutError::Network(_)
                | ScoutError::Timeout(_)
        )
    }
}

impl From<sqlx::Error> for ScoutError {
    fn from(err: sqlx::Error) -> Self {
        ScoutError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for ScoutError {
    fn from(err: serde_json::Error) -> Self {
        ScoutError::Serialization(err.to_string())
    }
}
