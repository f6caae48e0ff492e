//! Audit error types

use thiserror::Error;

/// Errors raised by audit logging or querying
#[derive(Debug, Error)]
pub enum AuditError {
    /// IO error from the file-backed repository
    #[error("audit IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("audit serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The backing store failed
    #[error("audit repository error: {0}")]
    Repository(String),
}

/// Result type alias for audit operations
pub type Result<T> = std::result::Result<T, AuditError>;
