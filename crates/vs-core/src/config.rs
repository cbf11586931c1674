//! Engine configuration.
//!
//! The top-level [`Config`] struct is deserialized from JSON and carries the
//! tool and encoder settings. Every section defaults sensibly so a
//! completely empty `{}` file is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;
use crate::Error;

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tools: ToolsConfig,
    pub encode: EncodeConfig,
}

impl Config {
    /// Deserialize a `Config` from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self> {
        serde_json::from_str(json_str)
            .map_err(|e| Error::Validation(format!("config parse error: {e}")))
    }

    /// Load configuration from a file path, falling back to defaults if the
    /// path is `None` or the file does not exist.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_json(&contents).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse config file {}: {e}", path.display());
                Self::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No config file at {}; using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Failed to read config file {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        for (name, path) in [
            ("tools.ffmpeg_path", &self.tools.ffmpeg_path),
            ("tools.ffprobe_path", &self.tools.ffprobe_path),
        ] {
            if let Some(p) = path {
                if !p.exists() {
                    warnings.push(format!(
                        "{name} {} does not exist; the search path will be used",
                        p.display()
                    ));
                }
            }
        }

        let ratio = self.encode.size_safety_ratio;
        if !(ratio > 0.0 && ratio <= 1.0) {
            warnings.push(format!(
                "encode.size_safety_ratio {ratio} is outside (0, 1]; re-encoded parts may exceed the limit"
            ));
        }

        if self.encode.fallback_crf > 51 {
            warnings.push(format!(
                "encode.fallback_crf {} is above 51 and will be rejected by x264",
                self.encode.fallback_crf
            ));
        }

        if self.tools.probe_timeout_secs == 0 || self.tools.process_timeout_secs == 0 {
            warnings.push("a tool timeout of 0 seconds fails every invocation".into());
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// External tool locations and process limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Explicit ffmpeg binary, checked before any search directory.
    pub ffmpeg_path: Option<PathBuf>,
    /// Explicit ffprobe binary, checked before any search directory.
    pub ffprobe_path: Option<PathBuf>,
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,
    #[serde(default = "default_process_timeout")]
    pub process_timeout_secs: u64,
    /// Time a cancelled process gets to quit before it is killed.
    #[serde(default = "default_cancel_grace")]
    pub cancel_grace_secs: u64,
}

fn default_probe_timeout() -> u64 {
    60
}
fn default_process_timeout() -> u64 {
    86_400
}
fn default_cancel_grace() -> u64 {
    5
}

impl ToolsConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn process_timeout(&self) -> Duration {
        Duration::from_secs(self.process_timeout_secs)
    }

    pub fn cancel_grace(&self) -> Duration {
        Duration::from_secs(self.cancel_grace_secs)
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: None,
            ffprobe_path: None,
            probe_timeout_secs: default_probe_timeout(),
            process_timeout_secs: default_process_timeout(),
            cancel_grace_secs: default_cancel_grace(),
        }
    }
}

/// Re-encode settings for oversized parts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodeConfig {
    #[serde(default = "default_video_codec")]
    pub video_codec: String,
    #[serde(default = "default_preset")]
    pub preset: String,
    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,
    #[serde(default = "default_audio_bitrate")]
    pub audio_bitrate_bps: u64,
    /// Floor for the computed video bit rate.
    #[serde(default = "default_min_video_bitrate")]
    pub min_video_bitrate_bps: u64,
    /// Constant-quality value used when a part's duration is unknown.
    #[serde(default = "default_fallback_crf")]
    pub fallback_crf: u32,
    /// Fraction of the size ceiling a re-encode aims for.
    #[serde(default = "default_size_safety_ratio")]
    pub size_safety_ratio: f64,
}

fn default_video_codec() -> String {
    "libx264".into()
}
fn default_preset() -> String {
    "medium".into()
}
fn default_audio_codec() -> String {
    "aac".into()
}
fn default_audio_bitrate() -> u64 {
    128_000
}
fn default_min_video_bitrate() -> u64 {
    200_000
}
fn default_fallback_crf() -> u32 {
    23
}
fn default_size_safety_ratio() -> f64 {
    0.98
}

impl Default for EncodeConfig {
    fn default() -> Self {
        Self {
            video_codec: default_video_codec(),
            preset: default_preset(),
            audio_codec: default_audio_codec(),
            audio_bitrate_bps: default_audio_bitrate(),
            min_video_bitrate_bps: default_min_video_bitrate(),
            fallback_crf: default_fallback_crf(),
            size_safety_ratio: default_size_safety_ratio(),
        }
    }
}
