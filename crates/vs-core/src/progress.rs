//! Progress snapshots and the single-consumer channel that carries them.
//!
//! The executor owns the [`ProgressSender`]; the caller owns the matching
//! [`ProgressReceiver`]. Snapshots are immutable and discarded once read.

use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Phase of a split run, declared in the order a run first enters them.
///
/// Re-encoding interleaves with splitting ticks; `Completed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitPhase {
    Preparing,
    CopySplitting,
    Reencoding,
    Completed,
}

impl fmt::Display for SplitPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SplitPhase::Preparing => "preparing",
            SplitPhase::CopySplitting => "splitting",
            SplitPhase::Reencoding => "re-encoding",
            SplitPhase::Completed => "completed",
        };
        f.write_str(s)
    }
}

/// A point-in-time view of a split run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitProgress {
    pub phase: SplitPhase,
    pub completed_parts: u32,
    pub total_parts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SplitProgress {
    /// Snapshot without a message.
    pub fn new(phase: SplitPhase, completed_parts: u32, total_parts: u32) -> Self {
        Self {
            phase,
            completed_parts,
            total_parts,
            message: None,
        }
    }

    /// Attach a human-readable status message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Completion ratio in percent; `0.0` when there are no parts yet.
    pub fn percentage(&self) -> f64 {
        if self.total_parts == 0 {
            0.0
        } else {
            self.completed_parts as f64 / self.total_parts as f64 * 100.0
        }
    }
}

/// Receiving half of a progress channel.
pub type ProgressReceiver = mpsc::UnboundedReceiver<SplitProgress>;

/// Sending half of a progress channel.
///
/// Sends never block and never fail: once the receiver is dropped further
/// snapshots are discarded.
#[derive(Debug, Clone)]
pub struct ProgressSender {
    tx: Option<mpsc::UnboundedSender<SplitProgress>>,
}

impl ProgressSender {
    /// A sender that discards all snapshots.
    pub fn noop() -> Self {
        Self { tx: None }
    }

    /// Emit a snapshot.
    pub fn send(&self, progress: SplitProgress) {
        tracing::trace!(
            phase = %progress.phase,
            completed = progress.completed_parts,
            total = progress.total_parts,
            "progress"
        );
        if let Some(tx) = &self.tx {
            let _ = tx.send(progress);
        }
    }
}

/// Create a connected sender/receiver pair.
pub fn progress_channel() -> (ProgressSender, ProgressReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ProgressSender { tx: Some(tx) }, rx)
}
