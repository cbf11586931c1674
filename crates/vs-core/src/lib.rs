//! vs-core: shared types, errors, configuration, split planning and
//! progress snapshots.
//!
//! This crate is the foundational dependency for the other vs-* crates. It
//! holds everything that can be computed without touching an external tool:
//! the [`SplitPlan`] arithmetic, part naming, the unified [`Error`] type and
//! the [`SplitProgress`] snapshots sent to callers.

pub mod config;
pub mod error;
pub mod media;
pub mod plan;
pub mod progress;

// Re-export the most commonly used items at the crate root.
pub use error::{Error, Result};
pub use media::{format_duration, format_size, ProbeResult, GIB};
pub use plan::{SplitPart, SplitPlan};
pub use progress::{progress_channel, ProgressReceiver, ProgressSender, SplitPhase, SplitProgress};
