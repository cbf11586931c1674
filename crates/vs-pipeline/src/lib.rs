//! # vs-pipeline
//!
//! Orchestration of a split run.
//!
//! This crate provides:
//!
//! - **[`SplitBackend`]** trait -- the three external capabilities a run
//!   needs (probe, copy-split, re-encode), with [`FfmpegBackend`] as the
//!   real implementation.
//! - **[`SplitContext`]** -- cancellation token and progress sender threaded
//!   through a run.
//! - **[`SplitExecutor`]** -- the state machine that plans, copy-splits,
//!   re-encodes oversized parts and reports progress.

pub mod backend;
pub mod context;
pub mod executor;

// Re-export key types at the crate root.
pub use backend::{FfmpegBackend, SplitBackend};
pub use context::SplitContext;
pub use executor::{SplitExecutor, SplitRequest};
