//! [`ExecutionSession`]: one editor buffer and its remote execution.
//!
//! Wraps the [`ExecutionRequest`] state machine in a watch channel the same
//! way the sample store does. At most one request is pending; a submission
//! while pending is rejected with [`ClientError::Busy`] and sends nothing.

use std::sync::Arc;

use tokio::sync::watch;

use monkeypad_core::{ExecutionRequest, ExecutionStatus};

use crate::api::CodeApi;
use crate::error::ClientError;
use crate::remote::Transport;

/// Render state of an execution session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionSnapshot {
    pub request: ExecutionRequest,
    pub detached: bool,
}

impl ExecutionSnapshot {
    pub fn status(&self) -> &ExecutionStatus {
        &self.request.status
    }

    pub fn source(&self) -> &str {
        &self.request.source
    }
}

/// Shared handle to an execution session.
pub struct ExecutionSession<T> {
    api: CodeApi<T>,
    state: Arc<watch::Sender<ExecutionSnapshot>>,
}

impl<T> Clone for ExecutionSession<T> {
    fn clone(&self) -> Self {
        ExecutionSession {
            api: self.api.clone(),
            state: Arc::clone(&self.state),
        }
    }
}

impl<T: Transport> ExecutionSession<T> {
    pub fn new(api: CodeApi<T>) -> Self {
        let (state, _) = watch::channel(ExecutionSnapshot::default());
        ExecutionSession {
            api,
            state: Arc::new(state),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ExecutionSnapshot> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> ExecutionSnapshot {
        self.state.borrow().clone()
    }

    /// Replaces the editor text. A displayed output or error is cleared.
    pub fn edit_text(&self, text: impl Into<String>) {
        let text = text.into();
        self.state.send_if_modified(|s| !s.detached && s.request.edit(text));
    }

    /// Submits the current text.
    pub async fn run(&self) -> Result<ExecutionStatus, ClientError> {
        self.submit(None).await
    }

    /// Sets the text to `source` and submits it in one step. While a request
    /// is pending this is rejected and the text is left unchanged.
    pub async fn execute(&self, source: impl Into<String>) -> Result<ExecutionStatus, ClientError> {
        self.submit(Some(source.into())).await
    }

    /// Stops notifications and drops a pending response when it arrives.
    pub fn on_detach(&self) {
        self.state.send_if_modified(|s| {
            let changed = !s.detached;
            s.detached = true;
            changed
        });
    }

    async fn submit(&self, source: Option<String>) -> Result<ExecutionStatus, ClientError> {
        let mut payload = Err(ClientError::Detached);
        self.state.send_if_modified(|s| {
            if s.detached {
                return false;
            }
            if s.request.status.is_pending() {
                payload = Err(ClientError::Busy {
                    operation: "execution",
                });
                return false;
            }
            if let Some(source) = source {
                s.request.edit(source);
            }
            payload = s.request.submit().map_err(ClientError::from);
            payload.is_ok()
        });
        let payload = payload?;

        tracing::debug!(bytes = payload.len(), "submitting code for execution");
        let output = match self.api.compile(&payload).await {
            Ok(output) => Some(output),
            Err(err) => {
                tracing::warn!("code execution failed: {}", err);
                None
            }
        };

        let mut status = None;
        self.state.send_if_modified(|s| {
            if s.detached || !s.request.resolve(output) {
                return false;
            }
            status = Some(s.request.status.clone());
            true
        });
        status.ok_or(ClientError::Detached)
    }
}
