//! Unified error type for videosplitter.
//!
//! All crates funnel their failures into [`Error`]. Callers distinguish a
//! cooperative cancellation from a real failure with [`Error::is_cancelled`],
//! and the CLI derives its process exit status from [`Error::exit_code`].

use std::path::PathBuf;

/// Unified error type covering all failure modes of a split run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An input file does not exist.
    #[error("file not found: {}", path.display())]
    FileNotFound {
        /// The path that was looked up.
        path: PathBuf,
    },

    /// One or more required external binaries could not be located.
    #[error("tool not found: {message}")]
    ToolNotFound {
        /// Names the missing binaries and the directories searched.
        message: String,
    },

    /// A numeric argument is outside its accepted range.
    #[error("out of range: {0}")]
    OutOfRange(String),

    /// An external tool (ffmpeg, ffprobe) failed or could not be run.
    #[error("Tool error [{tool}]: {message}")]
    Tool {
        /// Name of the tool that failed.
        tool: String,
        /// Human-readable error description, including captured output.
        message: String,
    },

    /// The analysis tool produced output without the expected structure.
    #[error("Probe error: {0}")]
    Probe(String),

    /// A planned output path already exists and overwriting was not requested.
    #[error("output already exists: {}", path.display())]
    Conflict {
        /// The first colliding path.
        path: PathBuf,
    },

    /// The operation observed its cancellation signal.
    #[error("operation cancelled")]
    Cancelled,

    /// Configuration could not be parsed.
    #[error("Validation error: {0}")]
    Validation(String),

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },
}

impl Error {
    /// Convenience constructor for [`Error::FileNotFound`].
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Error::FileNotFound { path: path.into() }
    }

    /// Convenience constructor for [`Error::Tool`].
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::Conflict`].
    pub fn conflict(path: impl Into<PathBuf>) -> Self {
        Error::Conflict { path: path.into() }
    }

    /// Whether this error is a cancellation rather than a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::FileNotFound { .. } | Error::ToolNotFound { .. } => 3,
            Error::OutOfRange(_) | Error::Validation(_) => 2,
            Error::Tool { .. } | Error::Probe(_) => 4,
            Error::Conflict { .. } => 5,
            Error::Io { .. } => 1,
            Error::Cancelled => 130,
        }
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
