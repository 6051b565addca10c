//! Core error types for monkeypad-core.
//!
//! Uses `thiserror` for structured, matchable variants covering local
//! validation, state-machine guards, and unexpected response shapes.

use thiserror::Error;

/// Errors produced by the monkeypad-core crate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// A required text field was empty after trimming.
    #[error("{field} must not be empty")]
    EmptyField { field: &'static str },

    /// A submission was attempted while a request is still pending.
    #[error("an execution request is already pending")]
    ExecutionPending,

    /// A service response did not have any of the accepted shapes.
    #[error("malformed response: {reason}")]
    MalformedResponse { reason: String },
}
