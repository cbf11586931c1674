//! Log sink setup.
//!
//! Every sink is a `fmt` layer on one registry, behind a shared `EnvFilter`.
//! `RUST_LOG` wins over the built-in directives.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

/// Where log lines go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogSink {
    Stderr,
    /// Appended to; parent directories are created.
    File(PathBuf),
}

/// Log file used when none is given on the command line.
pub fn default_log_file(runtime_dir: &Path) -> PathBuf {
    runtime_dir.join("logs").join("app.log")
}

fn directives(verbose: bool) -> &'static str {
    if verbose {
        "videosplitter=debug,vs_core=debug,vs_av=debug,vs_pipeline=debug"
    } else {
        "videosplitter=info,vs_core=info,vs_av=info,vs_pipeline=info"
    }
}

fn open_log_file(path: &Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Install the global subscriber.
///
/// A file sink that cannot be opened is skipped with a warning once the
/// remaining sinks are live.
pub fn init(sinks: &[LogSink], verbose: bool) -> anyhow::Result<()> {
    let filter = std::env::var("RUST_LOG")
        .ok()
        .and_then(|v| EnvFilter::try_new(v).ok())
        .unwrap_or_else(|| EnvFilter::new(directives(verbose)));

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();
    let mut failures = Vec::new();

    for sink in sinks {
        match sink {
            LogSink::Stderr => {
                layers.push(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(false)
                        .boxed(),
                );
            }
            LogSink::File(path) => match open_log_file(path) {
                Ok(file) => {
                    layers.push(
                        fmt::layer()
                            .with_writer(Mutex::new(file))
                            .with_ansi(false)
                            .boxed(),
                    );
                }
                Err(e) => failures.push(format!("cannot open log file {}: {e}", path.display())),
            },
        }
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()?;

    for failure in failures {
        tracing::warn!("{failure}; logging to the remaining sinks only");
    }
    Ok(())
}
