//! Error types for RelayQ operations.

use crate::message::Outcome;
use thiserror::Error;

/// Result type used throughout RelayQ.
pub type DispatchResult<T> = Result<T, DispatchError>;

/// Main error type for RelayQ operations.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// A dispatcher thread is already active
    #[error("Dispatcher is already running")]
    AlreadyRunning,

    /// Start was attempted without a bound handler
    #[error("No message handler registered")]
    NoHandler,

    /// The handler returned a non-good outcome and the run was aborted
    #[error("Message handler reported {outcome}, dispatcher stopped")]
    HandlerFailed {
        /// The outcome that aborted the run
        outcome: Outcome,
    },

    /// The handler panicked on the dispatcher thread
    #[error("Message handler panicked: {message}")]
    HandlerPanicked {
        /// Panic payload, when it was a string
        message: String,
    },

    /// The OS refused to spawn the dispatcher thread
    #[error("Failed to spawn dispatcher thread: {0}")]
    ThreadSpawn(#[source] std::io::Error),

    /// Listening for a shutdown signal failed
    #[error("Failed to listen for shutdown signal: {0}")]
    Signal(#[source] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Error message
        message: String,
    },

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl DispatchError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }
}

/// Extract a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            DispatchError::AlreadyRunning.to_string(),
            "Dispatcher is already running"
        );
        assert_eq!(
            DispatchError::NoHandler.to_string(),
            "No message handler registered"
        );

        let failed = DispatchError::HandlerFailed {
            outcome: Outcome::PreviousError,
        };
        assert!(failed.to_string().contains("previous error"));
    }

    #[test]
    fn test_panic_payloads() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");

        let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");

        let payload: Box<dyn std::any::Any + Send> = Box::new(42u32);
        assert_eq!(panic_message(payload.as_ref()), "non-string panic payload");
    }

    #[test]
    fn test_config_helper() {
        match DispatchError::config("bad name") {
            DispatchError::ConfigError { message } => assert_eq!(message, "bad name"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
