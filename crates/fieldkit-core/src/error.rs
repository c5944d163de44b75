//! Error types for fieldkit-core

use thiserror::Error;

/// Result type alias using fieldkit-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the queue store, configuration and template handling.
///
/// Failures of a single queued mutation are not errors: the sync engine
/// records them on the item and reports them in its `SyncReport`.
#[derive(Error, Debug)]
pub enum Error {
    /// Stored data that this build cannot interpret
    #[error("Database error: {0}")]
    Database(String),

    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A queued mutation, dead letter or photo that does not exist
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Rejected input: bad enum names, empty fields, invalid templates
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Missing or malformed client configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}
