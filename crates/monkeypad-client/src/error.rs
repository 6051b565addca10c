//! Client error types.
//!
//! [`TransportError`] is the single failure a [`crate::Transport`] reports.
//! [`ClientError`] is what store and session operations return; lower-layer
//! errors convert into it with `?`.

use monkeypad_core::CoreError;

/// A failed remote call: network error, non-2xx status, or an unreadable
/// response body.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", describe(.status, .message))]
pub struct TransportError {
    /// HTTP status when the service answered with a non-success code.
    pub status: Option<u16>,
    /// Human-readable cause.
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        TransportError {
            status: None,
            message: message.into(),
        }
    }

    pub fn with_status(status: u16, message: impl Into<String>) -> Self {
        TransportError {
            status: Some(status),
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        TransportError {
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}

fn describe(status: &Option<u16>, message: &str) -> String {
    match status {
        Some(code) => format!("HTTP {}: {}", code, message),
        None => message.to_string(),
    }
}

/// Errors returned by store and session operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// Rejected locally before any network call.
    #[error("validation failed: {0}")]
    Validation(CoreError),

    /// Name-to-id resolution produced no id.
    #[error("no code sample named '{name}'")]
    NotFound { name: String },

    /// The remote call failed or answered with an unusable body.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Another call for the same slot is still unresolved.
    #[error("{operation} already in progress")]
    Busy { operation: &'static str },

    /// The component was detached; the response was dropped.
    #[error("component detached")]
    Detached,

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<CoreError> for ClientError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::EmptyField { .. } => ClientError::Validation(err),
            CoreError::ExecutionPending => ClientError::Busy {
                operation: "execution",
            },
            CoreError::MalformedResponse { reason } => {
                ClientError::Transport(TransportError::new(reason))
            }
        }
    }
}
