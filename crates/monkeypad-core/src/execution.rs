//! The execution request state machine.
//!
//! ```text
//! Idle ──submit──▶ Pending ──ok──▶ Succeeded(output)
//!   ▲                 │
//!   │                 └──err──▶ Failed(message)
//!   └──edit── Succeeded | Failed
//! ```
//!
//! Submission is allowed from every state except `Pending`. Edits while a
//! result is displayed drop the result.

use crate::error::CoreError;

/// User-facing message for any failed execution. The underlying cause is
/// never shown.
pub const EXECUTION_FAILED_MESSAGE: &str = "Error executing code. Please try again.";

/// Status of the session's single execution request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ExecutionStatus {
    #[default]
    Idle,
    Pending,
    Succeeded { output: String },
    Failed { message: String },
}

impl ExecutionStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, ExecutionStatus::Pending)
    }

    /// True when a result (output or error) is on display.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExecutionStatus::Succeeded { .. } | ExecutionStatus::Failed { .. }
        )
    }
}

/// Source text plus the status of its latest submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionRequest {
    /// Current editor contents.
    pub source: String,
    /// Text captured by the latest submission.
    pub submitted_source: Option<String>,
    pub status: ExecutionStatus,
}

impl ExecutionRequest {
    pub fn new(source: impl Into<String>) -> Self {
        ExecutionRequest {
            source: source.into(),
            ..Default::default()
        }
    }

    /// Replaces the source text. A displayed result becomes stale and is
    /// cleared; a pending request keeps its captured payload.
    ///
    /// Returns whether anything changed.
    pub fn edit(&mut self, text: impl Into<String>) -> bool {
        let text = text.into();
        let mut changed = false;
        if self.status.is_terminal() {
            self.status = ExecutionStatus::Idle;
            changed = true;
        }
        if self.source != text {
            self.source = text;
            changed = true;
        }
        changed
    }

    /// Moves to `Pending` and returns the payload to send.
    pub fn submit(&mut self) -> Result<String, CoreError> {
        if self.status.is_pending() {
            return Err(CoreError::ExecutionPending);
        }
        self.status = ExecutionStatus::Pending;
        self.submitted_source = Some(self.source.clone());
        Ok(self.source.clone())
    }

    /// Applies the response of the pending request.
    ///
    /// `output` is `None` when the request failed; a failure of any kind
    /// becomes the fixed generic message. Returns `false` (and changes
    /// nothing) when no request is pending.
    pub fn resolve(&mut self, output: Option<String>) -> bool {
        if !self.status.is_pending() {
            return false;
        }
        self.status = match output {
            Some(output) => ExecutionStatus::Succeeded { output },
            None => ExecutionStatus::Failed {
                message: EXECUTION_FAILED_MESSAGE.to_string(),
            },
        };
        true
    }
}
