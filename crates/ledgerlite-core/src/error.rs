use rust_decimal::Decimal;
use thiserror::Error;

/// Domain failures raised by the ledger and carried inside `anyhow::Error`.
///
/// The HTTP layer downcasts to this type to pick a status code; anything that
/// is not a `LedgerError` is treated as an internal failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("journal entry is unbalanced: debits {debits} != credits {credits}")]
    Unbalanced { debits: Decimal, credits: Decimal },

    #[error("cannot move invoice from {from} to {to}")]
    InvalidStatusTransition { from: String, to: String },

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unauthorized(String),
}

impl LedgerError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }
}
