//! FFprobe-backed probing.
//!
//! Shells out to `ffprobe -v error -print_format json -show_entries ...` and
//! maps the JSON output into [`vs_core::ProbeResult`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Deserializer};
use tokio_util::sync::CancellationToken;
use vs_core::{Error, ProbeResult};

use crate::command::ToolCommand;

/// Fields requested from ffprobe.
const SHOW_ENTRIES: &str = "format=duration,size,bit_rate:stream=duration";

/// A prober backed by the `ffprobe` CLI.
#[derive(Debug, Clone)]
pub struct FfprobeProber {
    /// Path to the ffprobe binary.
    ffprobe_path: PathBuf,
    timeout: Duration,
    grace: Duration,
}

impl FfprobeProber {
    /// Create a new prober using the given ffprobe path.
    pub fn new(ffprobe_path: PathBuf) -> Self {
        Self {
            ffprobe_path,
            timeout: Duration::from_secs(60),
            grace: Duration::from_secs(5),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_grace_period(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Probe `path` for duration, size and bit rate.
    ///
    /// # Errors
    ///
    /// - [`Error::FileNotFound`] if `path` does not exist.
    /// - [`Error::Tool`] if ffprobe fails to run or exits non-zero.
    /// - [`Error::Probe`] if the output is not JSON with a `format` section.
    /// - [`Error::Cancelled`] if `cancel` fires while ffprobe runs.
    pub async fn probe(&self, path: &Path, cancel: &CancellationToken) -> vs_core::Result<ProbeResult> {
        if !path.exists() {
            return Err(Error::file_not_found(path));
        }

        let mut cmd = ToolCommand::new(self.ffprobe_path.clone());
        cmd.timeout(self.timeout).grace_period(self.grace);
        cmd.args(["-v", "error", "-print_format", "json", "-show_entries", SHOW_ENTRIES]);
        cmd.arg(path.to_string_lossy().as_ref());

        let output = cmd.execute_cancellable(cancel).await?;
        let result = parse_probe_output(&output.stdout)?;

        tracing::debug!(
            "ffprobe {}: duration={:.3}s, size={} bytes, bitrate={} bps",
            path.display(),
            result.duration_secs,
            result.file_size_bytes,
            result.bit_rate_bps
        );
        Ok(result)
    }
}

// ---------------------------------------------------------------------------
// JSON structures
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: Option<FfprobeFormat>,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    #[serde(default, deserialize_with = "lenient_number")]
    duration: f64,
    #[serde(default, deserialize_with = "lenient_number")]
    size: f64,
    #[serde(default, deserialize_with = "lenient_number")]
    bit_rate: f64,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    #[serde(default, deserialize_with = "lenient_number")]
    duration: f64,
}

/// Accept a quoted numeric string or a native number; anything else is 0.
fn lenient_number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(serde_json::Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    })
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Map ffprobe JSON into a [`ProbeResult`].
///
/// A zero container duration falls back to the first positive stream
/// duration; a zero bit rate is derived from size and duration.
pub fn parse_probe_output(json: &str) -> vs_core::Result<ProbeResult> {
    let output: FfprobeOutput = serde_json::from_str(json)
        .map_err(|e| Error::Probe(format!("ffprobe returned invalid JSON: {e}")))?;

    let format = output
        .format
        .ok_or_else(|| Error::Probe("ffprobe output has no format section".into()))?;

    let mut duration = format.duration;
    if duration <= 0.0 {
        duration = output
            .streams
            .iter()
            .map(|s| s.duration)
            .find(|d| *d > 0.0)
            .unwrap_or(0.0);
    }

    let mut bit_rate = format.bit_rate;
    if bit_rate <= 0.0 && duration > 0.0 && format.size > 0.0 {
        bit_rate = (format.size * 8.0 / duration).floor();
    }

    Ok(ProbeResult::new(duration, format.size, bit_rate))
}
