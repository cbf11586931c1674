//! # vs-av
//!
//! External tool plumbing for videosplitter.
//!
//! This crate provides:
//!
//! - **Tool discovery** ([`ToolLocator`]) -- find ffmpeg and ffprobe in the
//!   bundled directory, the application directory or `PATH`.
//! - **Command execution** ([`ToolCommand`]) -- async builder with timeout,
//!   cooperative cancellation and concurrent stdout/stderr draining.
//! - **Probing** ([`FfprobeProber`]) -- duration, size and bit rate via
//!   ffprobe's JSON output.
//! - **Workspace management** ([`Workspace`]) -- sibling temporary directory
//!   for replacing a file in place.
//! - **Action functions** ([`actions`]) -- lossless copy-split and
//!   re-encoding of oversized parts.

pub mod actions;
pub mod command;
pub mod probe;
pub mod tools;
pub mod workspace;

// ---- Re-exports for convenience ----

pub use command::{ToolCommand, ToolOutput};
pub use probe::FfprobeProber;
pub use tools::{check_tools, ToolConfig, ToolInfo, ToolLocator, Tools};
pub use workspace::Workspace;

// Action functions
pub use actions::{
    check_conflicts, collect_parts, copy_split, reencode_part, remove_existing_parts,
    EncodeMode, ReencodeOutcome,
};
