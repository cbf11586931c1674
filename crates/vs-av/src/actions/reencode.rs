//! Re-encoding of a single part that exceeds the size ceiling.

use std::path::Path;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use vs_core::config::EncodeConfig;
use vs_core::{format_size, Error};

use crate::tools::Tools;
use crate::workspace::Workspace;

/// Rate control used for a re-encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EncodeMode {
    /// Average video bit rate derived from the size ceiling.
    TargetBitrate { video_bitrate_bps: u64 },
    /// Constant quality, used when the part's duration is unknown.
    ConstantQuality { crf: u32 },
}

/// Result of re-encoding one part.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReencodeOutcome {
    pub mode: EncodeMode,
    pub final_size_bytes: u64,
    /// False when the re-encoded part is still over the ceiling.
    pub within_limit: bool,
}

/// Video bit rate that lands a part of `duration_secs` just under
/// `max_bytes`, after the audio track's share.
pub fn target_video_bitrate(duration_secs: f64, max_bytes: f64, config: &EncodeConfig) -> u64 {
    let target_bytes = max_bytes * config.size_safety_ratio;
    let total_bps = (target_bytes * 8.0).max(1.0) / duration_secs;
    let video_bps = total_bps - config.audio_bitrate_bps as f64;
    if video_bps.is_finite() && video_bps > config.min_video_bitrate_bps as f64 {
        video_bps as u64
    } else {
        config.min_video_bitrate_bps
    }
}

/// Containers that benefit from moving the index to the front.
fn supports_faststart(path: &Path) -> bool {
    matches!(
        path.extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref(),
        Some("mp4" | "m4v" | "mov" | "m4a")
    )
}

/// Arguments for re-encoding `input` into `output` with `mode`.
pub fn build_encode_args(
    input: &Path,
    output: &Path,
    mode: &EncodeMode,
    config: &EncodeConfig,
) -> Vec<String> {
    let mut args: Vec<String> = ["-hide_banner", "-nostats", "-loglevel", "error", "-y", "-i"]
        .into_iter()
        .map(String::from)
        .collect();
    args.push(input.to_string_lossy().to_string());
    args.extend(["-map".to_string(), "0".to_string()]);
    args.extend(["-c:v".to_string(), config.video_codec.clone()]);
    args.extend(["-preset".to_string(), config.preset.clone()]);

    match mode {
        EncodeMode::TargetBitrate { video_bitrate_bps } => {
            let kbps = (video_bitrate_bps / 1000).max(1);
            let maxrate = kbps * 11 / 10;
            let bufsize = kbps * 2;
            args.extend([
                "-b:v".to_string(),
                format!("{kbps}k"),
                "-maxrate".to_string(),
                format!("{maxrate}k"),
                "-bufsize".to_string(),
                format!("{bufsize}k"),
            ]);
        }
        EncodeMode::ConstantQuality { crf } => {
            args.extend(["-crf".to_string(), crf.to_string()]);
        }
    }

    args.extend([
        "-c:a".to_string(),
        config.audio_codec.clone(),
        "-b:a".to_string(),
        format!("{}k", (config.audio_bitrate_bps / 1000).max(1)),
    ]);
    if supports_faststart(output) {
        args.extend(["-movflags".to_string(), "+faststart".to_string()]);
    }
    args.push(output.to_string_lossy().to_string());
    args
}

/// Re-encode `part` in place so it fits under `max_bytes`.
///
/// The part is re-probed first. If its duration cannot be determined the
/// encode falls back to constant quality. The result replaces the original
/// only once ffmpeg has finished; a failed or cancelled encode leaves the
/// original untouched. A result that is still too large is logged, not
/// retried.
///
/// # Errors
///
/// - [`Error::Tool`] if ffmpeg fails.
/// - [`Error::Cancelled`] if `cancel` fires during the probe or encode.
/// - [`Error::Io`] if the replacement cannot be swapped in.
pub async fn reencode_part(
    tools: &Tools,
    part: &Path,
    max_bytes: f64,
    config: &EncodeConfig,
    cancel: &CancellationToken,
) -> vs_core::Result<ReencodeOutcome> {
    let mode = match tools.prober().probe(part, cancel).await {
        Ok(probe) if probe.duration_secs > 0.0 => EncodeMode::TargetBitrate {
            video_bitrate_bps: target_video_bitrate(probe.duration_secs, max_bytes, config),
        },
        Ok(_) => {
            tracing::warn!(
                "Duration of {:?} is unknown; encoding at constant quality",
                part
            );
            EncodeMode::ConstantQuality {
                crf: config.fallback_crf,
            }
        }
        Err(Error::Cancelled) => return Err(Error::Cancelled),
        Err(e) => {
            tracing::warn!("Re-probe of {:?} failed ({e}); encoding at constant quality", part);
            EncodeMode::ConstantQuality {
                crf: config.fallback_crf,
            }
        }
    };

    tracing::info!(
        "Re-encode: {:?} (mode={:?}, codec={}, preset={}, limit={})",
        part,
        mode,
        config.video_codec,
        config.preset,
        format_size(max_bytes)
    );

    let workspace = Workspace::beside(part)?;
    let mut cmd = tools.ffmpeg_command();
    cmd.args(build_encode_args(part, &workspace.output(), &mode, config));
    cmd.execute_cancellable(cancel).await?;

    let final_path = workspace.finalize()?;
    let final_size_bytes = std::fs::metadata(&final_path)?.len();
    let within_limit = final_size_bytes as f64 <= max_bytes;

    if within_limit {
        tracing::info!(
            "Re-encoded {:?} to {}",
            final_path,
            format_size(final_size_bytes as f64)
        );
    } else {
        tracing::warn!(
            "Re-encoded {:?} is still {} (limit {})",
            final_path,
            format_size(final_size_bytes as f64),
            format_size(max_bytes)
        );
    }

    Ok(ReencodeOutcome {
        mode,
        final_size_bytes,
        within_limit,
    })
}
