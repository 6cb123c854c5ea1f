//! Queue Error Types

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    #[error("Queue capacity must be greater than zero (got {capacity})")]
    InvalidCapacity { capacity: usize },

    #[error("Queue is full (capacity: {capacity})")]
    QueueFull { capacity: usize },

    #[error("No more data available for this cursor")]
    NoMoreData,

    #[error("Queue is closed")]
    Closed,

    #[error("Queue no longer exists")]
    QueueDropped,

    #[error("Queue synchronisation failed: {message}")]
    Poisoned { message: String },
}

/// Result type for queue operations
pub type QueueResult<T> = Result<T, QueueError>;
