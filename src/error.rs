//! Error types for the tally digest engine.

use crate::model::OwnerId;

/// Top-level error type for the digest and reminder engine.
#[derive(Debug, thiserror::Error)]
pub enum TallyError {
    /// Digest requested for an identity with no owner record.
    #[error("owner not found: {0}")]
    OwnerNotFound(OwnerId),

    /// Repository read failure (bulk load, owner enumeration).
    #[error("repository error: {0}")]
    Repository(String),

    /// Settings store failure or rejected settings update.
    #[error("settings error: {0}")]
    Settings(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Scheduler error (lifecycle, stop timeout).
    #[error("scheduler error: {0}")]
    Scheduler(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, TallyError>;
