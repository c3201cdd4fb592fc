//! Error types for bindings and signal emissions.

use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised at the call site of a binding operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BindError {
    /// The element is not part of a live UI tree, so it has no context.
    #[error("element `{element}` is not attached to a UI context")]
    NotAttached { element: String },
}

/// Result type for binding operations
pub type Result<T> = std::result::Result<T, BindError>;

/// A failure emitted by a signal in place of a value.
///
/// Cheap to clone so the same failure can fan out to every listener.
#[derive(Error, Clone)]
#[error("signal failed: {message}")]
pub struct SignalError {
    message: Arc<str>,
}

impl SignalError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: Arc::from(message.into()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Debug for SignalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SignalError").field(&&*self.message).finish()
    }
}

impl PartialEq for SignalError {
    fn eq(&self, other: &Self) -> bool {
        self.message == other.message
    }
}

impl Eq for SignalError {}

/// One delivery from a signal: a value or a failure.
pub type Emission<T> = std::result::Result<T, SignalError>;
