//! Error types for attachment reclassification.

use thiserror::Error;

/// Result type alias using reclass's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for reclassification operations.
///
/// Variants map onto the failure points of a run: only `Connection` (and a
/// failed initial listing) aborts the run, everything else is recovered per
/// attachment or per record.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Could not reach the record store at startup
    #[error("Connection error: {0}")]
    Connection(String),

    /// Transport or auth failure that says nothing about object presence
    #[error("Transient error: {0}")]
    Transient(String),

    /// Downloading object bytes failed
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// Uploading the corrected copy failed
    #[error("Upload error: {0}")]
    Upload(String),

    /// Removing the stale copy failed
    #[error("Delete error: {0}")]
    Delete(String),

    /// Writing a record's attachment collection failed
    #[error("Persist error for record {record_id}: {message}")]
    Persist { record_id: i64, message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Short, stable label for the failure class, used in logs and reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Database(_) => "database",
            Error::Connection(_) => "connection",
            Error::Transient(_) => "transient",
            Error::Fetch(_) => "fetch",
            Error::Upload(_) => "upload",
            Error::Delete(_) => "delete",
            Error::Persist { .. } => "persist",
            Error::Serialization(_) => "serialization",
            Error::Config(_) => "config",
            Error::InvalidInput(_) => "invalid_input",
            Error::Internal(_) => "internal",
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
