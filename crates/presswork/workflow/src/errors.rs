use presswork_storage::StorageError;
use presswork_types::{ItemId, OrderId};
use thiserror::Error;

/// Result type for workflow operations.
pub type WorkflowResult<T> = Result<T, WorkflowError>;

/// Workflow-layer errors.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Business-rule rejection. Collects every violated rule so a caller can
    /// surface all of them at once.
    #[error("validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("order not found: {0}")]
    OrderNotFound(OrderId),

    #[error("manufacturing item not found: {0}")]
    ItemNotFound(ItemId),

    /// The order changed under the caller; re-read and retry.
    #[error("concurrent update: {0}")]
    Conflict(String),

    #[error(transparent)]
    Storage(StorageError),
}

impl WorkflowError {
    pub fn validation(message: impl Into<String>) -> Self {
        WorkflowError::Validation(vec![message.into()])
    }
}

impl From<StorageError> for WorkflowError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Conflict(msg) => WorkflowError::Conflict(msg),
            StorageError::UniqueViolation(msg) => WorkflowError::Validation(vec![msg]),
            other => WorkflowError::Storage(other),
        }
    }
}
