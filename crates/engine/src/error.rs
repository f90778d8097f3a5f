//! Engine error types
//!
//! [`EngineError`] is what the worker loop sees. [`ObserverError`] is what
//! application observers return; it wraps any error type so observer code can
//! use `?` freely.

use std::fmt;
use thiserror::Error;

/// Errors surfaced by the observer engine
#[derive(Debug, Error)]
pub enum EngineError {
    /// The store or transaction primitive failed with a non-conflict error
    #[error("store error: {0}")]
    Store(#[from] cascade_core::Error),

    /// Invalid engine configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Workers kept finding pending notifications
    #[error("notifications still pending after {passes} passes")]
    NotQuiescent {
        /// Number of passes run
        passes: usize,
    },

    /// A worker thread panicked
    #[error("worker thread {0} panicked")]
    WorkerPanicked(String),
}

impl EngineError {
    /// Check if retrying the same operation may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            EngineError::Store(e) => e.is_retryable(),
            _ => false,
        }
    }
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Error returned by application observer code
///
/// Any `std::error::Error + Send + Sync` converts into it, so observers can
/// propagate store errors and their own errors with `?`.
pub struct ObserverError(Box<dyn std::error::Error + Send + Sync + 'static>);

impl ObserverError {
    /// Create an error from a message
    pub fn msg(message: impl fmt::Display) -> Self {
        ObserverError(message.to_string().into())
    }

    /// Borrow the wrapped error
    pub fn inner(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        &*self.0
    }

    /// Unwrap into the boxed error
    pub fn into_inner(self) -> Box<dyn std::error::Error + Send + Sync + 'static> {
        self.0
    }

    /// Recover the store error this wraps, if it wraps one
    pub fn into_store_error(self) -> std::result::Result<cascade_core::Error, ObserverError> {
        self.0
            .downcast::<cascade_core::Error>()
            .map(|e| *e)
            .map_err(ObserverError)
    }
}

impl<E> From<E> for ObserverError
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn from(e: E) -> Self {
        ObserverError(Box::new(e))
    }
}

impl fmt::Debug for ObserverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for ObserverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}
