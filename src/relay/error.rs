//! Relay Error Types

use crate::queue::QueueError;

/// Failures of the ingest and polling side of the relay
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RelayError {
    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error("Invalid relay setting {setting}: {message}")]
    InvalidSetting { setting: String, message: String },

    #[error("Failed to start writer thread {name}: {message}")]
    WorkerSpawn { name: String, message: String },

    #[error("Cannot read input {source_name}: {message}")]
    Input { source_name: String, message: String },
}

pub type RelayResult<T> = Result<T, RelayError>;

/// Outcome of a failed downstream delivery
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProcessError {
    /// The downstream rejected the payload (4xx)
    #[error("{status} {message}")]
    Client { status: u16, message: String },

    /// The downstream failed while handling the payload (5xx)
    #[error("{status} {message}")]
    Server { status: u16, message: String },

    /// Anything else: transport failures, undecodable payloads, panics
    #[error("{message}")]
    Unexpected { message: String },
}

impl ProcessError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected {
            message: message.into(),
        }
    }

    /// Failures worth another attempt
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Server { .. } | Self::Unexpected { .. })
    }
}

pub type ProcessResult<T> = Result<T, ProcessError>;

#[derive(Debug, thiserror::Error)]
pub enum DeadLetterError {
    #[error("Cannot write dead-letter file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot encode dead-letter record: {0}")]
    Encode(#[from] serde_json::Error),
}

pub type DeadLetterResult<T> = Result<T, DeadLetterError>;
