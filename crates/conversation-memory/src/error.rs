use thiserror::Error;

use crate::key::MemoryKey;

pub type MemoryResult<T> = std::result::Result<T, MemoryError>;

/// Errors raised by the conversation memory store.
///
/// `NotFound` is a valid state (first turn, expired or forgotten record), not a
/// failure. Callers on the read path degrade every variant to "no history".
#[derive(Error, Debug)]
pub enum MemoryError {
    #[error("No conversation record for key {key}")]
    NotFound { key: MemoryKey },

    #[error("Object store transport error: {source}")]
    Transport {
        #[source]
        source: TransportError,
    },

    #[error("Malformed conversation record {key} at line {line}: {reason}")]
    MalformedRecord {
        key: MemoryKey,
        line: usize,
        reason: String,
    },
}

impl MemoryError {
    pub fn transport(err: impl Into<TransportError>) -> Self {
        MemoryError::Transport { source: err.into() }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, MemoryError::NotFound { .. })
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, MemoryError::Transport { .. })
    }
}

/// I/O failure reported by an object store backend.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected status {status} for {path}")]
    Status { status: u16, path: String },

    #[error("{0}")]
    Other(String),
}
