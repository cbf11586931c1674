//! Media metadata returned by a probe.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Bytes per gigabyte. Thresholds are binary gigabytes (GiB).
pub const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Duration, size and bit rate of a media file.
///
/// Any field the analysis tool could not report is `0.0`; callers must
/// tolerate zero-valued fields.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ProbeResult {
    /// Playback duration in seconds.
    pub duration_secs: f64,
    /// File size in bytes.
    pub file_size_bytes: f64,
    /// Overall bit rate in bits per second.
    pub bit_rate_bps: f64,
}

impl ProbeResult {
    /// Build a result, clamping negative and non-finite inputs to zero.
    pub fn new(duration_secs: f64, file_size_bytes: f64, bit_rate_bps: f64) -> Self {
        Self {
            duration_secs: non_negative(duration_secs),
            file_size_bytes: non_negative(file_size_bytes),
            bit_rate_bps: non_negative(bit_rate_bps),
        }
    }

    /// Duration as a [`Duration`].
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.duration_secs)
    }

    /// Size in gigabytes.
    pub fn size_gigabytes(&self) -> f64 {
        self.file_size_bytes / GIB
    }
}

fn non_negative(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

/// Render a byte count with 1024-step units, e.g. `1.5 GB`.
pub fn format_size(bytes: f64) -> String {
    const UNITS: [&str; 6] = ["B", "KB", "MB", "GB", "TB", "PB"];
    let mut size = bytes.max(0.0);
    for unit in &UNITS[..UNITS.len() - 1] {
        if size < 1024.0 {
            return format!("{size:.1} {unit}");
        }
        size /= 1024.0;
    }
    format!("{size:.1} {}", UNITS[UNITS.len() - 1])
}

/// Render seconds as `HH:MM:SS`.
pub fn format_duration(secs: f64) -> String {
    let total = secs.max(0.0).round() as u64;
    format!("{:02}:{:02}:{:02}", total / 3600, (total / 60) % 60, total % 60)
}
