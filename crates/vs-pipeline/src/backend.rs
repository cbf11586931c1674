//! The external capabilities a split run depends on.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use vs_core::config::EncodeConfig;
use vs_core::{ProbeResult, SplitPlan};

use vs_av::{ReencodeOutcome, Tools};

/// Probe, copy-split and re-encode, as seen by the executor.
///
/// Every call receives the run's cancellation token and must return
/// [`vs_core::Error::Cancelled`] when it fires mid-call.
#[async_trait]
pub trait SplitBackend: Send + Sync {
    /// Duration, size and bit rate of `input`.
    async fn probe(&self, input: &Path, cancel: &CancellationToken)
        -> vs_core::Result<ProbeResult>;

    /// Segment `input` into `output_dir` and return the produced parts in
    /// order.
    async fn copy_split(
        &self,
        input: &Path,
        output_dir: &Path,
        plan: &SplitPlan,
        extension: &str,
        cancel: &CancellationToken,
    ) -> vs_core::Result<Vec<PathBuf>>;

    /// Replace `part` with a re-encode aimed below `max_bytes`.
    async fn reencode(
        &self,
        part: &Path,
        max_bytes: f64,
        cancel: &CancellationToken,
    ) -> vs_core::Result<ReencodeOutcome>;
}

/// Backend driving the located ffmpeg and ffprobe binaries.
#[derive(Debug, Clone)]
pub struct FfmpegBackend {
    tools: Tools,
    encode: EncodeConfig,
}

impl FfmpegBackend {
    pub fn new(tools: Tools, encode: EncodeConfig) -> Self {
        Self { tools, encode }
    }

    pub fn tools(&self) -> &Tools {
        &self.tools
    }
}

#[async_trait]
impl SplitBackend for FfmpegBackend {
    async fn probe(
        &self,
        input: &Path,
        cancel: &CancellationToken,
    ) -> vs_core::Result<ProbeResult> {
        self.tools.prober().probe(input, cancel).await
    }

    async fn copy_split(
        &self,
        input: &Path,
        output_dir: &Path,
        plan: &SplitPlan,
        extension: &str,
        cancel: &CancellationToken,
    ) -> vs_core::Result<Vec<PathBuf>> {
        vs_av::copy_split(&self.tools, input, output_dir, plan, extension, cancel).await
    }

    async fn reencode(
        &self,
        part: &Path,
        max_bytes: f64,
        cancel: &CancellationToken,
    ) -> vs_core::Result<ReencodeOutcome> {
        vs_av::reencode_part(&self.tools, part, max_bytes, &self.encode, cancel).await
    }
}
