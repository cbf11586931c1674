//! Execution context threaded through a split run.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use vs_core::{Error, ProgressSender, SplitProgress};

/// Cancellation and progress for one run.
///
/// The caller keeps a clone of the token to request cancellation and the
/// receiving half of the progress channel to observe the run.
#[derive(Debug, Clone)]
pub struct SplitContext {
    /// Checked between steps and handed to every external process.
    pub cancellation: CancellationToken,
    /// Channel for reporting progress to the caller.
    pub progress: Arc<ProgressSender>,
}

impl SplitContext {
    /// A context that is never cancelled and discards progress.
    pub fn new() -> Self {
        Self {
            cancellation: CancellationToken::new(),
            progress: Arc::new(ProgressSender::noop()),
        }
    }

    /// Builder: attach a cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Builder: attach a progress sender.
    pub fn with_progress(mut self, progress: ProgressSender) -> Self {
        self.progress = Arc::new(progress);
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// `Err(Cancelled)` once cancellation has been requested.
    pub fn check_cancelled(&self) -> vs_core::Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }

    pub fn report(&self, progress: SplitProgress) {
        self.progress.send(progress);
    }
}

impl Default for SplitContext {
    fn default() -> Self {
        Self::new()
    }
}
