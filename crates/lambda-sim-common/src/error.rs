//! Error types for the simulator.
//!
//! Capacity rejection has no variant in [`SimulatorError`]: a throttled
//! request is an ordinary `429` response.

use std::io;

use thiserror::Error;

/// Boxed error type used for failures coming from the hosted application or
/// from buffering a request body.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors surfaced by the instance pool and the request forwarder.
#[derive(Error, Debug)]
pub enum SimulatorError {
    /// The simulator was disposed and can no longer hand out instances.
    #[error("Simulator has been disposed")]
    Disposed,

    /// Invalid configuration was provided at construction.
    #[error("Invalid configuration: {reason}")]
    InvalidConfig {
        /// Description of the configuration error.
        reason: String,
    },

    /// The hosted application failed to produce a response.
    #[error("Invocation failed on instance {instance_id}: {source}")]
    Invocation {
        /// Identifier of the instance that served the request.
        instance_id: String,
        /// The underlying application error.
        #[source]
        source: BoxError,
    },

    /// The caller cancelled the request.
    #[error("Request cancelled during {stage}")]
    Cancelled {
        /// The suspension point that observed the cancellation.
        stage: &'static str,
    },

    /// The inbound request body could not be buffered for forwarding.
    #[error("Failed to read request body: {source}")]
    RequestBody {
        /// The underlying body error.
        #[source]
        source: BoxError,
    },

    /// I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl SimulatorError {
    /// Create a new `InvalidConfig` error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Create a new `Invocation` error.
    pub fn invocation(instance_id: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Invocation {
            instance_id: instance_id.into(),
            source: source.into(),
        }
    }

    /// Create a new `RequestBody` error.
    pub fn request_body(source: impl Into<BoxError>) -> Self {
        Self::RequestBody {
            source: source.into(),
        }
    }

    /// Returns `true` if this error indicates use after disposal.
    pub fn is_disposed(&self) -> bool {
        matches!(self, Self::Disposed)
    }

    /// Returns `true` if this error was caused by caller cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            SimulatorError::Disposed.to_string(),
            "Simulator has been disposed"
        );

        let err = SimulatorError::invalid_config("max_concurrency must be greater than zero");
        assert_eq!(
            err.to_string(),
            "Invalid configuration: max_concurrency must be greater than zero"
        );

        let err = SimulatorError::Cancelled { stage: "cold start" };
        assert_eq!(err.to_string(), "Request cancelled during cold start");
    }

    #[test]
    fn test_invocation_keeps_source() {
        let err = SimulatorError::invocation("abc", "handler exploded");

        assert!(err.to_string().contains("abc"));
        assert!(err.to_string().contains("handler exploded"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_predicates() {
        assert!(SimulatorError::Disposed.is_disposed());
        assert!(!SimulatorError::Disposed.is_cancelled());
        assert!(SimulatorError::Cancelled { stage: "invoke" }.is_cancelled());
        assert!(!SimulatorError::invalid_config("x").is_disposed());
    }
}
