//! Split planning: how many parts, how long each, and what they are called.
//!
//! Planning is pure arithmetic over a [`ProbeResult`]. The part count is the
//! larger of the size-driven and duration-driven minimums, and every part
//! gets the same nominal length. A highly variable bit rate can still push
//! an individual part over the size ceiling; re-encoding handles that later.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::media::{ProbeResult, GIB};

/// Base name used when the source name is blank.
pub const DEFAULT_BASE_NAME: &str = "output";

/// Extension used when the source has none.
pub const DEFAULT_EXTENSION: &str = ".mp4";

/// Size ceiling used when the caller does not choose one, in GiB.
pub const DEFAULT_MAX_GIGABYTES: f64 = 1.5;

/// Duration ceiling used when the caller does not choose one, in minutes.
pub const DEFAULT_MAX_MINUTES: f64 = 50.0;

/// Shortest segment time handed to the segmenter, in seconds.
pub const MIN_SEGMENT_SECS: f64 = 1.0;

/// An immutable split plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitPlan {
    /// Prefix of every output file name.
    pub base_name: String,
    /// Number of parts requested from the segmenter.
    pub part_count: u32,
    /// Nominal length of each part, in seconds.
    pub segment_length_secs: f64,
    /// Size ceiling for every part, in bytes.
    pub maximum_size_bytes: f64,
}

impl SplitPlan {
    /// Derive a plan from probe results and user constraints.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfRange`] if `max_gigabytes` or `max_minutes` is
    /// not a finite, strictly positive number.
    pub fn new(
        probe: &ProbeResult,
        max_gigabytes: f64,
        max_minutes: f64,
        base_name: Option<&str>,
    ) -> Result<Self> {
        validate_constraints(max_gigabytes, max_minutes)?;

        let maximum_size_bytes = max_gigabytes * GIB;
        let maximum_secs = max_minutes * 60.0;

        let size_parts = (probe.file_size_bytes / maximum_size_bytes).ceil();
        let time_parts = (probe.duration_secs / maximum_secs).ceil();
        let part_count = size_parts.max(time_parts).max(1.0).min(u32::MAX as f64) as u32;

        let mut segment_length_secs = probe.duration_secs / part_count as f64;
        if segment_length_secs <= 0.0 {
            segment_length_secs = probe.duration_secs;
        }

        Ok(Self {
            base_name: normalize_base_name(base_name),
            part_count,
            segment_length_secs,
            maximum_size_bytes,
        })
    }

    /// Segment time argument for the segmenter, never below one second.
    pub fn segment_time_secs(&self) -> f64 {
        self.segment_length_secs.max(MIN_SEGMENT_SECS)
    }

    /// The planned parts, indexed from 1.
    pub fn parts(&self) -> Vec<SplitPart> {
        (1..=self.part_count)
            .map(|index| SplitPart {
                base_name: self.base_name.clone(),
                index,
                nominal_duration_secs: self.segment_length_secs,
            })
            .collect()
    }

    /// Output file names for every planned part.
    pub fn file_names(&self, extension: &str) -> Vec<String> {
        self.parts().iter().map(|p| p.file_name(extension)).collect()
    }

    /// `printf`-style output pattern understood by the segmenter.
    pub fn segment_pattern(&self, extension: &str) -> String {
        format!(
            "{}_part_%02d{}",
            self.base_name.replace('%', "%%"),
            extension.replace('%', "%%")
        )
    }

    /// Recover the part index from a produced file name, if it belongs to
    /// this plan's naming scheme.
    pub fn part_index(&self, file_name: &str, extension: &str) -> Option<u32> {
        let digits = file_name
            .strip_prefix(self.base_name.as_str())?
            .strip_prefix("_part_")?
            .strip_suffix(extension)?;
        if digits.len() < 2 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok()
    }
}

/// One planned output part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitPart {
    pub base_name: String,
    /// One-based position in the output sequence.
    pub index: u32,
    pub nominal_duration_secs: f64,
}

impl SplitPart {
    /// `{base}_part_{NN}{ext}`, with the index zero-padded to two digits.
    pub fn file_name(&self, extension: &str) -> String {
        format!("{}_part_{:02}{}", self.base_name, self.index, extension)
    }
}

/// Reject size and duration limits that are not finite and strictly
/// positive.
pub fn validate_constraints(max_gigabytes: f64, max_minutes: f64) -> Result<()> {
    if !(max_gigabytes.is_finite() && max_gigabytes > 0.0) {
        return Err(Error::OutOfRange(format!(
            "maximum size must be greater than zero (got {max_gigabytes} GB)"
        )));
    }
    if !(max_minutes.is_finite() && max_minutes > 0.0) {
        return Err(Error::OutOfRange(format!(
            "maximum duration must be greater than zero (got {max_minutes} min)"
        )));
    }
    Ok(())
}

/// Trimmed base name, or [`DEFAULT_BASE_NAME`] when blank.
pub fn normalize_base_name(name: Option<&str>) -> String {
    match name.map(str::trim) {
        Some(n) if !n.is_empty() => n.to_string(),
        _ => DEFAULT_BASE_NAME.to_string(),
    }
}

/// Base name derived from a source path's file stem.
pub fn base_name_for(path: &Path) -> String {
    normalize_base_name(path.file_stem().and_then(|s| s.to_str()))
}

/// Extension (with leading dot) of a source path, or [`DEFAULT_EXTENSION`].
pub fn extension_for(path: &Path) -> String {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if !ext.is_empty() => format!(".{ext}"),
        _ => DEFAULT_EXTENSION.to_string(),
    }
}
