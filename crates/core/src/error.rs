//! Error types shared by every layer of the store
//!
//! Higher layers (engine, facade) wrap this type rather than re-declaring
//! store failures.

use thiserror::Error;

/// Errors produced by the store and transaction primitive
#[derive(Debug, Error)]
pub enum Error {
    /// Commit-time validation failed against a concurrent writer
    ///
    /// The transaction wrote nothing. Retrying with a fresh snapshot may succeed.
    #[error("transaction conflict: {0}")]
    TransactionConflict(String),

    /// Operation attempted on a transaction that is not Active
    #[error("transaction not active ({state})")]
    TransactionNotActive {
        /// Current state of the transaction
        state: String,
    },

    /// Caller supplied an invalid argument
    #[error("invalid input: {message}")]
    InvalidInput {
        /// Description of the problem
        message: String,
    },

    /// Encoding or decoding a stored record failed
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The storage layer failed
    #[error("storage error: {0}")]
    Storage(String),

    /// Invalid static configuration (e.g. two observers on one column)
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Internal error (bug or invariant violation)
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an [`Error::InvalidInput`]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Error::InvalidInput {
            message: message.into(),
        }
    }

    /// Check if this is a commit conflict
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::TransactionConflict(_))
    }

    /// Check if this error may succeed on retry with fresh data
    pub fn is_retryable(&self) -> bool {
        self.is_conflict()
    }
}
