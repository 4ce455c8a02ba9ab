//! # Error Types
//!
//! The typed error taxonomy shared by every controller.
//!
//! ## Categories
//!
//! 1. **Decode/format**: malformed transaction bytes. Never retried.
//! 2. **Precondition**: nonce, funds, signature, voting rights and periods,
//!    payload parameters, missing or duplicate proposals.
//! 3. **Domain invariant**: arithmetic overflow, wrong apply height.
//!
//! All three are per-transaction and non-fatal to the node. Structural
//! violations (height mismatch, divergent commit versions) are not errors at
//! all: the block application halts on them.

use thiserror::Error;

/// Response code reported for a successful operation.
pub const CODE_OK: u32 = 0;

/// Error returned by controllers, the transaction builder and the executor.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AppError {
    #[error("Malformed transaction: {0}")]
    Decode(String),

    #[error("Invalid amount")]
    InvalidAmount,

    #[error("Invalid gas: {gas} below minimum {minimum}")]
    InvalidGas { gas: u64, minimum: u64 },

    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Invalid nonce: expected {expected}, got {actual}")]
    InvalidNonce { expected: u64, actual: u64 },

    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: u128, available: u128 },

    #[error("Invalid signature")]
    InvalidSignature,

    /// The transaction type is outside the handler's domain. Callers that try
    /// every handler treat this as "not applicable", never as a failure.
    #[error("Unknown transaction type")]
    UnknownTrxType,

    #[error("No right to vote")]
    NoRight,

    #[error("Not voting period: height {height} outside [{start}, {end})")]
    NotVotingPeriod { height: u64, start: u64, end: u64 },

    #[error("Invalid choice: {0}")]
    InvalidChoice(i32),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Arithmetic overflow: {0}")]
    Overflow(&'static str),

    #[error("Invalid apply height: expected {expected}, got {actual}")]
    InvalidApplyHeight { expected: u64, actual: u64 },

    #[error("Invalid query path: {0}")]
    InvalidQueryPath(String),

    #[error("Invalid query data: {0}")]
    InvalidQueryData(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Sender is not a validator")]
    NotValidator,
}

impl AppError {
    /// Stable numeric code surfaced in protocol responses.
    pub fn code(&self) -> u32 {
        match self {
            Self::Decode(_) => 1,
            Self::InvalidAmount => 2,
            Self::InvalidGas { .. } => 3,
            Self::AccountNotFound(_) => 4,
            Self::InvalidNonce { .. } => 5,
            Self::InsufficientFunds { .. } => 6,
            Self::InvalidSignature => 7,
            Self::UnknownTrxType => 8,
            Self::NoRight => 9,
            Self::NotVotingPeriod { .. } => 10,
            Self::InvalidChoice(_) => 11,
            Self::NotFound(_) => 12,
            Self::DuplicateKey(_) => 13,
            Self::InvalidPayload(_) => 14,
            Self::Overflow(_) => 15,
            Self::InvalidApplyHeight { .. } => 16,
            Self::InvalidQueryPath(_) => 17,
            Self::InvalidQueryData(_) => 18,
            Self::Storage(_) => 19,
            Self::InvalidState(_) => 20,
            Self::NotValidator => 21,
        }
    }

    /// True when a handler declined the transaction as outside its domain.
    pub fn is_unknown_trx_type(&self) -> bool {
        matches!(self, Self::UnknownTrxType)
    }
}

/// Result type for controller operations.
pub type AppResult<T> = Result<T, AppError>;
