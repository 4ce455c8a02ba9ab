use shared_types::AppError;
use thiserror::Error;

/// Errors raised by the ledger and its storage ports.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Ledger {0} is closed")]
    Closed(&'static str),

    #[error("Version {requested} not available (latest {latest})")]
    VersionNotFound { requested: u64, latest: u64 },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

/// Result type for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

impl From<bincode::Error> for LedgerError {
    fn from(e: bincode::Error) -> Self {
        LedgerError::Serialization(e.to_string())
    }
}

impl From<LedgerError> for AppError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::VersionNotFound { requested, .. } => {
                AppError::NotFound(format!("ledger version {requested}"))
            }
            other => AppError::Storage(other.to_string()),
        }
    }
}
