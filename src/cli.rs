use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "videosplitter")]
#[command(author, version, about = "Split large videos into parts under a size and duration limit")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Write the log to this file instead of <runtime dir>/logs/app.log
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Size and duration limits; unset values come from the saved settings.
#[derive(Args, Debug, Clone, Default)]
pub struct LimitArgs {
    /// Maximum size of each part in GiB
    #[arg(long, value_name = "GB")]
    pub max_size_gb: Option<f64>,

    /// Maximum duration of each part in minutes
    #[arg(long, value_name = "MINUTES")]
    pub max_minutes: Option<f64>,

    /// Output name prefix (defaults to the input file name)
    #[arg(long, value_name = "BASE")]
    pub name: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Split a video into parts that fit the size and duration limits
    Split {
        /// Input video (defaults to the last one split)
        input: Option<PathBuf>,

        /// Directory for the parts
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,

        #[command(flatten)]
        limits: LimitArgs,

        /// Replace existing parts with the same names
        #[arg(long)]
        overwrite: bool,

        /// Show the plan without splitting
        #[arg(long)]
        dry_run: bool,
    },

    /// Probe a video and show how it would be split
    Plan {
        /// Input video
        #[arg(required = true)]
        input: PathBuf,

        #[command(flatten)]
        limits: LimitArgs,
    },

    /// Probe a media file and display duration, size and bit rate
    Probe {
        /// File to probe
        #[arg(required = true)]
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check that ffmpeg and ffprobe are available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
