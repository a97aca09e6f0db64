//! Error types for the queue state protocol

use thiserror::Error;

/// Result type alias for queue operations
pub type QueueResult<T> = Result<T, QueueError>;

/// Errors that can occur while reading, mutating or fetching queue state.
///
/// Missing counters and unrecognized actions are not errors: they are no-ops
/// (or version-only bumps) handled inside the store.
#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("State lock poisoned")]
    Lock,
}

impl From<sled::Error> for QueueError {
    fn from(err: sled::Error) -> Self {
        QueueError::Storage(err.to_string())
    }
}
