//! Error types for the feeder.

use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while generating or writing synthetic rows.
#[derive(Error, Debug)]
pub enum FeedError {
    /// The connection could not be established or was lost mid-operation.
    #[error("connection error: {0}")]
    Connection(#[source] BoxError),

    /// A reference set needed to build orders was empty.
    #[error("invalid reference data: {0}")]
    InvalidReferenceData(String),

    /// A read query failed for a reason unrelated to the connection.
    #[error("query failed: {0}")]
    Query(#[source] BoxError),

    /// A batch insert or its commit was rejected by the database.
    #[error("insert failed: {0}")]
    Insert(#[source] BoxError),

    /// Connection-class failures persisted through every allowed attempt.
    #[error("giving up after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: Box<FeedError>,
    },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl FeedError {
    /// Returns `true` for failures that a fresh connection may fix.
    ///
    /// Data-class failures (constraint violations, id collisions, empty reference
    /// sets) would simply recur, so they are not retried.
    pub fn is_connection_retryable(&self) -> bool {
        matches!(self, FeedError::Connection(_))
    }
}

/// Result type for feeder operations.
pub type FeedResult<T> = Result<T, FeedError>;
