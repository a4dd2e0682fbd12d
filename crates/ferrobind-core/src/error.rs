//! Bridge error types
//!
//! Every failure that reaches the scripting engine is a [`BridgeError`]; its
//! `Display` rendering is the message the script sees. Panics raised below a
//! script-visible entry point are caught and reported as
//! [`BridgeError::Panic`] instead of unwinding into the engine.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use ferrobind_metadata::{LoadError, MetadataError};
use thiserror::Error;

use crate::config::ConfigError;

/// Errors raised by the binding engine
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Metadata could not be decoded or a name could not be resolved
    #[error("Metadata error: {0}")]
    Metadata(#[from] MetadataError),

    /// Metadata could not be loaded from storage
    #[error(transparent)]
    Load(#[from] LoadError),

    /// Configuration could not be loaded
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Invalid script-level usage
    #[error("{0}")]
    Usage(String),

    /// No overload in the dispatch chain accepts the argument count
    #[error("No overload of method '{name}' accepts {args} argument(s)")]
    NoMatchingOverload {
        /// Method name
        name: String,
        /// Number of arguments at the call site
        args: usize,
    },

    /// Internal invariant violation
    #[error("(InternalError): {0}")]
    Internal(String),

    /// Error reported by the foreign runtime
    #[error("{0}")]
    Foreign(String),

    /// A panic was caught at a script-visible entry point
    #[error("Error: native exception: {0}")]
    Panic(String),
}

impl BridgeError {
    /// Create a usage error
    pub fn usage(message: impl Into<String>) -> Self {
        BridgeError::Usage(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        BridgeError::Internal(message.into())
    }

    /// Errors a script may catch and recover from
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            BridgeError::Usage(_) | BridgeError::NoMatchingOverload { .. } | BridgeError::Foreign(_)
        )
    }
}

impl From<String> for BridgeError {
    fn from(message: String) -> Self {
        BridgeError::Foreign(message)
    }
}

impl From<&str> for BridgeError {
    fn from(message: &str) -> Self {
        BridgeError::Foreign(message.to_string())
    }
}

/// Result type for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Run `f`, turning a panic into [`BridgeError::Panic`]
pub(crate) fn guard<T>(f: impl FnOnce() -> BridgeResult<T>) -> BridgeResult<T> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(BridgeError::Panic(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown".to_string()
    }
}
