//! Error types for espelho-core

use thiserror::Error;

/// Result type alias using espelho-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in espelho-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Schema creation or reset failed; the store is unusable and the
    /// operation must not be retried
    #[error("Schema error: {0}")]
    Schema(String),

    /// A local write transaction failed and was rolled back
    #[error("Transaction rolled back: {source}")]
    Transaction {
        #[source]
        source: rusqlite::Error,
    },

    /// SQLite error outside a write transaction
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Batch upload or snapshot fetch failed (unreachable, timeout, non-2xx)
    #[error("Transport error: {0}")]
    Transport(String),

    /// An operation id already exists in the mutation log
    #[error("Duplicate operation: {0}")]
    DuplicateOperation(String),

    /// Entity not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Wrap a SQLite failure that aborted a write transaction
    pub(crate) fn transaction(source: rusqlite::Error) -> Self {
        Self::Transaction { source }
    }
}
