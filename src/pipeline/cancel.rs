//! Cooperative cancellation shared between a caller and a pipeline run.

use std::sync::Arc;

use tokio::sync::watch;

use super::error::{PipelineError, Stage};

/// Cloneable flag checked between stages and before each generation call.
///
/// Waits such as the rate-limit backoff end as soon as the flag is raised. A
/// generation call already in flight is allowed to finish or time out.
#[derive(Debug, Clone)]
pub struct CancellationFlag(Arc<watch::Sender<bool>>);

impl Default for CancellationFlag {
    fn default() -> Self {
        Self(Arc::new(watch::Sender::new(false)))
    }
}

impl CancellationFlag {
    /// Creates a flag that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.send_replace(true);
    }

    /// Whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.0.borrow()
    }

    /// Resolves once cancellation is requested.
    pub async fn cancelled(&self) {
        let mut receiver = self.0.subscribe();
        // The sender outlives this receiver, so the wait only ends on cancel.
        drop(receiver.wait_for(|cancelled| *cancelled).await);
    }

    /// Fails with [`PipelineError::Cancelled`] if cancellation was requested.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Cancelled`] naming `next_stage`.
    pub fn check(&self, next_stage: Stage) -> Result<(), PipelineError> {
        if self.is_cancelled() {
            return Err(PipelineError::Cancelled { stage: next_stage });
        }
        Ok(())
    }
}
