//! Unified error types for Cascade.
//!
//! This module provides a single error type that wraps the store, transaction
//! and engine errors and presents a consistent interface to users.

use thiserror::Error;

/// All Cascade errors.
#[derive(Debug, Error)]
pub enum Error {
    /// A commit lost to a concurrent writer; retry with a fresh transaction
    #[error("conflict: {0}")]
    Conflict(String),

    /// Operation on a committed or aborted transaction
    #[error("transaction not active: {0}")]
    TransactionNotActive(String),

    /// Invalid argument
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Invalid configuration (observer bindings or engine settings)
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Workers did not go idle within the configured number of passes
    #[error("notifications still pending after {passes} passes")]
    NotQuiescent {
        /// Passes run
        passes: usize,
    },

    /// A worker thread panicked
    #[error("worker {0} panicked")]
    WorkerPanicked(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Storage error
    #[error("storage error: {0}")]
    Storage(String),

    /// Internal error (bug or invariant violation)
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type for Cascade operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check if this error is retryable.
    ///
    /// Retryable errors (conflicts) may succeed on retry with fresh data.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Conflict(_))
    }

    /// Check if this is a conflict error.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Conflict(_))
    }

    /// Check if this is a serious/unrecoverable error.
    pub fn is_serious(&self) -> bool {
        matches!(self, Error::Internal(_) | Error::WorkerPanicked(_))
    }
}

// Convert from internal core errors
impl From<cascade_core::Error> for Error {
    fn from(e: cascade_core::Error) -> Self {
        use cascade_core::Error as CoreError;
        match e {
            CoreError::TransactionConflict(msg) => Error::Conflict(msg),
            CoreError::TransactionNotActive { state } => Error::TransactionNotActive(state),
            CoreError::InvalidInput { message } => Error::InvalidInput(message),
            CoreError::Serialization(msg) => Error::Serialization(msg),
            CoreError::Storage(msg) => Error::Storage(msg),
            CoreError::Configuration(msg) => Error::Configuration(msg),
            CoreError::Internal(msg) => Error::Internal(msg),
        }
    }
}

// Convert from engine errors
impl From<cascade_engine::EngineError> for Error {
    fn from(e: cascade_engine::EngineError) -> Self {
        use cascade_engine::EngineError;
        match e {
            EngineError::Store(inner) => inner.into(),
            EngineError::Config(msg) => Error::Configuration(msg),
            EngineError::NotQuiescent { passes } => Error::NotQuiescent { passes },
            EngineError::WorkerPanicked(name) => Error::WorkerPanicked(name),
        }
    }
}
