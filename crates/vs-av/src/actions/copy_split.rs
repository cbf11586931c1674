//! Lossless copy-split using ffmpeg's segment muxer.

use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;
use vs_core::{Error, SplitPlan};

use crate::tools::Tools;

/// Arguments for a stream-copy segmentation of `input` into `pattern`.
///
/// All streams are mapped, timestamps restart in every segment and the
/// segment counter starts at 1.
pub fn build_copy_split_args(input: &Path, pattern: &Path, segment_time_secs: f64) -> Vec<String> {
    let mut args: Vec<String> = ["-hide_banner", "-nostats", "-loglevel", "error", "-y", "-i"]
        .into_iter()
        .map(String::from)
        .collect();
    args.push(input.to_string_lossy().to_string());
    args.extend(
        ["-map", "0", "-c", "copy", "-f", "segment", "-segment_time"]
            .into_iter()
            .map(String::from),
    );
    args.push(format!("{segment_time_secs:.3}"));
    args.extend(
        ["-segment_start_number", "1", "-reset_timestamps", "1"]
            .into_iter()
            .map(String::from),
    );
    args.push(pattern.to_string_lossy().to_string());
    args
}

/// Copy-split `input` into `output_dir` according to `plan`, then return the
/// parts that were actually produced.
///
/// The segmenter cuts on keyframes, so the number of produced parts can
/// differ from `plan.part_count`.
///
/// # Errors
///
/// - [`Error::Tool`] if ffmpeg exits non-zero. Files it already wrote are
///   left in place.
/// - [`Error::Cancelled`] if `cancel` fires while ffmpeg runs.
pub async fn copy_split(
    tools: &Tools,
    input: &Path,
    output_dir: &Path,
    plan: &SplitPlan,
    extension: &str,
    cancel: &CancellationToken,
) -> vs_core::Result<Vec<PathBuf>> {
    let pattern = output_dir.join(plan.segment_pattern(extension));
    let segment_time = plan.segment_time_secs();

    tracing::info!(
        "Copy-split: {:?} -> {:?} (parts={}, segment_time={:.3}s)",
        input,
        pattern,
        plan.part_count,
        segment_time
    );

    let mut cmd = tools.ffmpeg_command();
    cmd.args(build_copy_split_args(input, &pattern, segment_time));
    cmd.execute_cancellable(cancel).await?;

    let parts = collect_parts(output_dir, plan, extension)?;
    if parts.len() as u32 != plan.part_count {
        tracing::info!(
            "Segmenter produced {} parts (planned {})",
            parts.len(),
            plan.part_count
        );
    }
    Ok(parts)
}

/// Files in `output_dir` that follow the plan's naming scheme, ordered by
/// part index.
pub fn collect_parts(
    output_dir: &Path,
    plan: &SplitPlan,
    extension: &str,
) -> vs_core::Result<Vec<PathBuf>> {
    let mut parts = Vec::new();
    for entry in std::fs::read_dir(output_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if let Some(index) = plan.part_index(name, extension) {
            parts.push((index, name.to_string(), entry.path()));
        }
    }
    parts.sort();
    Ok(parts.into_iter().map(|(_, _, path)| path).collect())
}

/// Delete every file in `output_dir` matching the plan's naming scheme.
/// Returns how many were removed.
pub fn remove_existing_parts(
    output_dir: &Path,
    plan: &SplitPlan,
    extension: &str,
) -> vs_core::Result<usize> {
    if !output_dir.is_dir() {
        return Ok(0);
    }
    let existing = collect_parts(output_dir, plan, extension)?;
    for path in &existing {
        tracing::debug!("Removing existing part {:?}", path);
        std::fs::remove_file(path)?;
    }
    Ok(existing.len())
}

/// Fail if any file in `output_dir` already follows the plan's naming
/// scheme, including indices beyond `plan.part_count`.
///
/// Enumeration after the split then only sees files the segmenter wrote.
///
/// # Errors
///
/// Returns [`Error::Conflict`] naming the lowest-indexed existing part.
pub fn check_conflicts(output_dir: &Path, plan: &SplitPlan, extension: &str) -> vs_core::Result<()> {
    if !output_dir.is_dir() {
        return Ok(());
    }
    match collect_parts(output_dir, plan, extension)?.into_iter().next() {
        Some(path) => Err(Error::conflict(path)),
        None => Ok(()),
    }
}
