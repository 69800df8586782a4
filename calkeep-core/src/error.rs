//! Error types for calkeep.

use thiserror::Error;

/// Errors that can occur in calkeep operations.
#[derive(Error, Debug)]
pub enum CalKeepError {
    /// The underlying store is unreachable or access was denied.
    #[error("Calendar store unavailable: {0}")]
    StoreUnavailable(String),

    /// The store rejected a save or remove.
    #[error("Persistence failed: {0}")]
    PersistenceFailed(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("ICS parse error: {0}")]
    IcsParse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for calkeep operations.
pub type CalKeepResult<T> = Result<T, CalKeepError>;
