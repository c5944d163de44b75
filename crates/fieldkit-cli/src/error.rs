use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] fieldkit_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("No payload provided; pass --payload or pipe JSON on stdin")]
    EmptyPayload,
    #[error("Payload must be a JSON object")]
    InvalidPayload,
    #[error("Invalid mutation ID: {0}")]
    InvalidMutationId(String),
    #[error("Answers must be a JSON array of answers or an object keyed by question id")]
    InvalidAnswers,
    #[error("Template is invalid:\n{0}")]
    InvalidTemplate(String),
    #[error("Photo file is empty: {0}")]
    EmptyPhoto(String),
    #[error("Nothing to change; pass --policy, --max-retries or --backoff-base-ms")]
    NoSettingsChange,
    #[error("Failed to resolve a data directory; pass --db-path or set FIELDKIT_DB_PATH")]
    NoDataDir,
}
