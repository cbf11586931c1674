//! Probe backends that shell out to external tools.
//!
//! [`FfprobeProber`] reports the duration, size and bit rate a split plan
//! is derived from.

pub mod ffprobe;

pub use self::ffprobe::{parse_probe_output, FfprobeProber};
