//! Split executor: probe, plan, copy-split, then re-encode any part over the
//! size ceiling, reporting progress and honoring cancellation throughout.

use std::path::{Path, PathBuf};

use vs_core::config::Config;
use vs_core::plan::{
    base_name_for, extension_for, validate_constraints, DEFAULT_MAX_GIGABYTES,
    DEFAULT_MAX_MINUTES,
};
use vs_core::{format_size, Error, ProbeResult, SplitPhase, SplitPlan, SplitProgress};
use vs_av::Tools;

use crate::backend::{FfmpegBackend, SplitBackend};
use crate::context::SplitContext;

/// What to split and under which limits.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitRequest {
    pub input: PathBuf,
    pub output_dir: PathBuf,
    pub max_gigabytes: f64,
    pub max_minutes: f64,
    /// Output name prefix; the input's file stem when unset or blank.
    pub base_name: Option<String>,
    /// Delete existing parts with the same naming scheme instead of failing.
    pub overwrite: bool,
}

impl SplitRequest {
    /// A request with the default limits and no overwrite.
    pub fn new(input: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output_dir: output_dir.into(),
            max_gigabytes: DEFAULT_MAX_GIGABYTES,
            max_minutes: DEFAULT_MAX_MINUTES,
            base_name: None,
            overwrite: false,
        }
    }

    pub fn with_limits(mut self, max_gigabytes: f64, max_minutes: f64) -> Self {
        self.max_gigabytes = max_gigabytes;
        self.max_minutes = max_minutes;
        self
    }

    pub fn with_base_name(mut self, base_name: impl Into<String>) -> Self {
        self.base_name = Some(base_name.into());
        self
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    fn effective_base_name(&self) -> String {
        match self.base_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => base_name_for(&self.input),
        }
    }
}

/// A probed source and the plan derived from it.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedSplit {
    pub probe: ProbeResult,
    pub plan: SplitPlan,
    /// Extension shared by the source and every part, with leading dot.
    pub extension: String,
}

impl PreparedSplit {
    /// Where each planned part will be written.
    pub fn output_paths(&self, output_dir: &Path) -> Vec<PathBuf> {
        self.plan
            .file_names(&self.extension)
            .into_iter()
            .map(|name| output_dir.join(name))
            .collect()
    }
}

/// Runs split requests against a [`SplitBackend`].
///
/// One external process runs at a time: the copy-split first, then one
/// re-encode per oversized part, in part order.
pub struct SplitExecutor {
    backend: Box<dyn SplitBackend>,
}

impl SplitExecutor {
    /// Executor backed by the located ffmpeg/ffprobe pair.
    pub fn new(tools: Tools, config: &Config) -> Self {
        Self::with_backend(FfmpegBackend::new(tools, config.encode.clone()))
    }

    pub fn with_backend(backend: impl SplitBackend + 'static) -> Self {
        Self {
            backend: Box::new(backend),
        }
    }

    /// Probe the input and compute the plan without touching the output
    /// directory.
    ///
    /// # Errors
    ///
    /// - [`Error::OutOfRange`] for non-positive limits, before probing.
    /// - [`Error::FileNotFound`] if the input does not exist.
    /// - Probe failures and [`Error::Cancelled`] from the backend.
    pub async fn plan(
        &self,
        request: &SplitRequest,
        ctx: &SplitContext,
    ) -> vs_core::Result<PreparedSplit> {
        validate_constraints(request.max_gigabytes, request.max_minutes)?;
        ctx.check_cancelled()?;

        let probe = self.backend.probe(&request.input, &ctx.cancellation).await?;
        let base_name = request.effective_base_name();
        let plan = SplitPlan::new(
            &probe,
            request.max_gigabytes,
            request.max_minutes,
            Some(&base_name),
        )?;

        tracing::info!(
            "Plan for {:?}: {} part(s) of ~{:.1}s, limit {} (source {}, {:.1}s)",
            request.input,
            plan.part_count,
            plan.segment_length_secs,
            format_size(plan.maximum_size_bytes),
            format_size(probe.file_size_bytes),
            probe.duration_secs
        );

        Ok(PreparedSplit {
            probe,
            plan,
            extension: extension_for(&request.input),
        })
    }

    /// Run a split to completion and return the final part paths in order.
    /// Paths are absolute even when `output_dir` is relative.
    ///
    /// Failures are logged before they are returned; cancellation is logged
    /// quietly and returned as [`Error::Cancelled`]. Parts already written
    /// are left on disk in both cases.
    pub async fn execute(
        &self,
        request: &SplitRequest,
        ctx: &SplitContext,
    ) -> vs_core::Result<Vec<PathBuf>> {
        match self.run(request, ctx).await {
            Err(Error::Cancelled) => {
                tracing::info!("Split of {:?} cancelled", request.input);
                Err(Error::Cancelled)
            }
            Err(e) => {
                tracing::error!("Split of {:?} failed: {e}", request.input);
                Err(e)
            }
            Ok(parts) => Ok(parts),
        }
    }

    async fn run(
        &self,
        request: &SplitRequest,
        ctx: &SplitContext,
    ) -> vs_core::Result<Vec<PathBuf>> {
        // -- Preparing ---------------------------------------------------------
        validate_constraints(request.max_gigabytes, request.max_minutes)?;
        ctx.check_cancelled()?;
        ctx.report(
            SplitProgress::new(SplitPhase::Preparing, 0, 0)
                .with_message(format!("Analyzing {}", display_name(&request.input))),
        );

        let prepared = self.plan(request, ctx).await?;
        let plan = &prepared.plan;
        let extension = prepared.extension.as_str();
        let total = plan.part_count;

        std::fs::create_dir_all(&request.output_dir)?;
        let output_dir = std::fs::canonicalize(&request.output_dir)?;
        if request.overwrite {
            let removed = vs_av::remove_existing_parts(&output_dir, plan, extension)?;
            if removed > 0 {
                tracing::info!("Removed {removed} existing part(s) from {:?}", output_dir);
            }
        } else {
            vs_av::check_conflicts(&output_dir, plan, extension)?;
        }

        ctx.report(SplitProgress::new(SplitPhase::Preparing, 0, 0).with_message(format!(
            "Planned {total} part(s) of up to {}",
            format_size(plan.maximum_size_bytes)
        )));

        // -- CopySplitting -----------------------------------------------------
        ctx.check_cancelled()?;
        ctx.report(
            SplitProgress::new(SplitPhase::CopySplitting, 0, total)
                .with_message(format!("Splitting into {total} part(s)")),
        );

        let parts = self
            .backend
            .copy_split(
                &request.input,
                &output_dir,
                plan,
                extension,
                &ctx.cancellation,
            )
            .await?;
        if parts.is_empty() {
            return Err(Error::tool(
                vs_av::tools::FFMPEG,
                "segmenter did not produce any output parts",
            ));
        }
        tracing::info!("Created {} part(s) via copy split", parts.len());

        // -- Per-part check and Reencoding -------------------------------------
        let mut completed: u32 = 0;
        for part in &parts {
            ctx.check_cancelled()?;

            let size = std::fs::metadata(part)?.len();
            if size as f64 > plan.maximum_size_bytes {
                ctx.report(
                    SplitProgress::new(SplitPhase::Reencoding, completed.min(total), total)
                        .with_message(format!(
                            "Re-encoding {} ({} > {})",
                            display_name(part),
                            format_size(size as f64),
                            format_size(plan.maximum_size_bytes)
                        )),
                );
                self.backend
                    .reencode(part, plan.maximum_size_bytes, &ctx.cancellation)
                    .await?;
            }

            completed += 1;
            let ticked = completed.min(total);
            let progress = SplitProgress::new(SplitPhase::CopySplitting, ticked, total)
                .with_message(format!("Finished {}", display_name(part)));
            tracing::info!("[{:.0}%] Finished: {}", progress.percentage(), display_name(part));
            ctx.report(progress);
        }

        // -- Completed ---------------------------------------------------------
        ctx.report(
            SplitProgress::new(SplitPhase::Completed, total, total)
                .with_message(format!("Created {} part(s)", parts.len())),
        );
        tracing::info!("[100%] Split of {:?} complete", request.input);

        Ok(parts)
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;
    use vs_av::{EncodeMode, ReencodeOutcome};
    use vs_core::{progress_channel, ProgressReceiver, GIB};

    // -- Fake backend ---------------------------------------------------------

    /// Writes parts of fixed sizes and shrinks re-encoded parts to
    /// `reencoded_size`.
    struct FakeBackend {
        probe: ProbeResult,
        part_sizes: Vec<u64>,
        reencoded_size: u64,
        probes: Arc<AtomicUsize>,
        splits: Arc<AtomicUsize>,
        reencodes: Arc<AtomicUsize>,
        /// Cancelled right after the first re-encode finishes.
        cancel_after_reencode: Option<CancellationToken>,
    }

    impl FakeBackend {
        fn new(probe: ProbeResult, part_sizes: Vec<u64>) -> Self {
            Self {
                probe,
                part_sizes,
                reencoded_size: 10,
                probes: Arc::new(AtomicUsize::new(0)),
                splits: Arc::new(AtomicUsize::new(0)),
                reencodes: Arc::new(AtomicUsize::new(0)),
                cancel_after_reencode: None,
            }
        }
    }

    #[async_trait]
    impl SplitBackend for FakeBackend {
        async fn probe(
            &self,
            input: &Path,
            _cancel: &CancellationToken,
        ) -> vs_core::Result<ProbeResult> {
            self.probes.fetch_add(1, Ordering::SeqCst);
            if !input.exists() {
                return Err(Error::file_not_found(input));
            }
            Ok(self.probe)
        }

        async fn copy_split(
            &self,
            _input: &Path,
            output_dir: &Path,
            plan: &SplitPlan,
            extension: &str,
            _cancel: &CancellationToken,
        ) -> vs_core::Result<Vec<PathBuf>> {
            self.splits.fetch_add(1, Ordering::SeqCst);
            for (i, size) in self.part_sizes.iter().enumerate() {
                let name = format!("{}_part_{:02}{}", plan.base_name, i + 1, extension);
                std::fs::write(output_dir.join(name), vec![0u8; *size as usize])?;
            }
            vs_av::collect_parts(output_dir, plan, extension)
        }

        async fn reencode(
            &self,
            part: &Path,
            max_bytes: f64,
            _cancel: &CancellationToken,
        ) -> vs_core::Result<ReencodeOutcome> {
            self.reencodes.fetch_add(1, Ordering::SeqCst);
            std::fs::write(part, vec![0u8; self.reencoded_size as usize])?;
            if let Some(token) = &self.cancel_after_reencode {
                token.cancel();
            }
            Ok(ReencodeOutcome {
                mode: EncodeMode::ConstantQuality { crf: 23 },
                final_size_bytes: self.reencoded_size,
                within_limit: self.reencoded_size as f64 <= max_bytes,
            })
        }
    }

    // -- Helpers --------------------------------------------------------------

    /// A source file plus an output directory inside one temp dir.
    fn scratch() -> (tempfile::TempDir, PathBuf, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("movie.mp4");
        std::fs::write(&input, b"source").unwrap();
        let out = dir.path().join("out");
        (dir, input, out)
    }

    /// Tiny limits: 100 bytes and 1 minute.
    fn tiny_limits(request: SplitRequest) -> SplitRequest {
        request.with_limits(100.0 / GIB, 1.0)
    }

    fn drain(rx: &mut ProgressReceiver) -> Vec<SplitProgress> {
        let mut events = Vec::new();
        while let Ok(p) = rx.try_recv() {
            events.push(p);
        }
        events
    }

    fn names(paths: &[PathBuf]) -> Vec<String> {
        paths.iter().map(|p| display_name(p)).collect()
    }

    // -- Tests ----------------------------------------------------------------

    #[tokio::test]
    async fn copy_only_run_returns_parts_in_order() {
        let (_dir, input, out) = scratch();
        let backend = FakeBackend::new(ProbeResult::new(180.0, 150.0, 0.0), vec![50, 50, 50]);
        let reencodes = backend.reencodes.clone();
        let executor = SplitExecutor::with_backend(backend);

        let (tx, mut rx) = progress_channel();
        let ctx = SplitContext::new().with_progress(tx);
        let parts = executor
            .execute(&tiny_limits(SplitRequest::new(&input, &out)), &ctx)
            .await
            .unwrap();

        assert_eq!(
            names(&parts),
            vec!["movie_part_01.mp4", "movie_part_02.mp4", "movie_part_03.mp4"]
        );
        assert_eq!(reencodes.load(Ordering::SeqCst), 0);

        let events = drain(&mut rx);
        assert_eq!(events.first().unwrap().phase, SplitPhase::Preparing);
        assert!(events
            .iter()
            .filter(|e| e.phase == SplitPhase::Preparing)
            .all(|e| e.total_parts == 0 && e.message.is_some()));
        let last = events.last().unwrap();
        assert_eq!(last.phase, SplitPhase::Completed);
        assert_eq!((last.completed_parts, last.total_parts), (3, 3));
        assert!(events.iter().all(|e| e.percentage() <= 100.0));
    }

    #[tokio::test]
    async fn oversized_part_is_reencoded_once() {
        let (_dir, input, out) = scratch();
        let backend = FakeBackend::new(ProbeResult::new(180.0, 280.0, 0.0), vec![90, 140, 50]);
        let reencodes = backend.reencodes.clone();
        let executor = SplitExecutor::with_backend(backend);

        let (tx, mut rx) = progress_channel();
        let ctx = SplitContext::new().with_progress(tx);
        let parts = executor
            .execute(&tiny_limits(SplitRequest::new(&input, &out)), &ctx)
            .await
            .unwrap();

        assert_eq!(parts.len(), 3);
        assert_eq!(reencodes.load(Ordering::SeqCst), 1);
        assert_eq!(std::fs::metadata(&parts[1]).unwrap().len(), 10);

        let events = drain(&mut rx);
        let reencoding: Vec<_> = events
            .iter()
            .filter(|e| e.phase == SplitPhase::Reencoding)
            .collect();
        assert_eq!(reencoding.len(), 1);
        assert_eq!(reencoding[0].completed_parts, 1);
        assert!(reencoding[0]
            .message
            .as_deref()
            .unwrap()
            .contains("movie_part_02.mp4"));

        // completed_parts never decreases across the run.
        let counts: Vec<u32> = events.iter().map(|e| e.completed_parts).collect();
        assert!(counts.windows(2).all(|w| w[0] <= w[1]), "{counts:?}");
    }

    #[tokio::test]
    async fn cancellation_between_reencodes_stops_the_run() {
        let (_dir, input, out) = scratch();
        let token = CancellationToken::new();
        let mut backend =
            FakeBackend::new(ProbeResult::new(180.0, 600.0, 0.0), vec![200, 200, 200]);
        backend.cancel_after_reencode = Some(token.clone());
        let reencodes = backend.reencodes.clone();
        let executor = SplitExecutor::with_backend(backend);

        let (tx, mut rx) = progress_channel();
        let ctx = SplitContext::new()
            .with_cancellation(token)
            .with_progress(tx);
        let result = executor
            .execute(&tiny_limits(SplitRequest::new(&input, &out)), &ctx)
            .await;

        assert_matches!(result, Err(Error::Cancelled));
        assert_eq!(reencodes.load(Ordering::SeqCst), 1);
        let events = drain(&mut rx);
        assert!(events.iter().all(|e| e.phase != SplitPhase::Completed));
    }

    #[tokio::test]
    async fn cancelled_before_start_never_probes() {
        let (_dir, input, out) = scratch();
        let backend = FakeBackend::new(ProbeResult::new(10.0, 10.0, 0.0), vec![10]);
        let probes = backend.probes.clone();
        let executor = SplitExecutor::with_backend(backend);

        let token = CancellationToken::new();
        token.cancel();
        let ctx = SplitContext::new().with_cancellation(token);
        let result = executor.execute(&SplitRequest::new(&input, &out), &ctx).await;

        assert_matches!(result, Err(Error::Cancelled));
        assert_eq!(probes.load(Ordering::SeqCst), 0);
        assert!(!out.exists());
    }

    #[tokio::test]
    async fn invalid_limits_fail_before_probing() {
        let (_dir, input, out) = scratch();
        let backend = FakeBackend::new(ProbeResult::new(10.0, 10.0, 0.0), vec![10]);
        let probes = backend.probes.clone();
        let executor = SplitExecutor::with_backend(backend);

        for (gb, minutes) in [(0.0, 50.0), (1.5, -1.0), (f64::NAN, 50.0)] {
            let request = SplitRequest::new(&input, &out).with_limits(gb, minutes);
            let result = executor.execute(&request, &SplitContext::new()).await;
            assert_matches!(result, Err(Error::OutOfRange(_)));
        }
        assert_eq!(probes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_input_is_not_found() {
        let (dir, _input, out) = scratch();
        let executor = SplitExecutor::with_backend(FakeBackend::new(ProbeResult::default(), vec![]));
        let request = SplitRequest::new(dir.path().join("absent.mp4"), &out);
        let result = executor.execute(&request, &SplitContext::new()).await;
        assert_matches!(result, Err(Error::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn existing_part_conflicts_without_overwrite() {
        let (_dir, input, out) = scratch();
        std::fs::create_dir_all(&out).unwrap();
        std::fs::write(out.join("movie_part_02.mp4"), b"old").unwrap();

        let backend = FakeBackend::new(ProbeResult::new(180.0, 150.0, 0.0), vec![50, 50, 50]);
        let splits = backend.splits.clone();
        let executor = SplitExecutor::with_backend(backend);

        let result = executor
            .execute(&tiny_limits(SplitRequest::new(&input, &out)), &SplitContext::new())
            .await;
        assert_matches!(result, Err(Error::Conflict { ref path }) if path.ends_with("movie_part_02.mp4"));
        assert_eq!(splits.load(Ordering::SeqCst), 0);
        assert_eq!(std::fs::read(out.join("movie_part_02.mp4")).unwrap(), b"old");
    }

    #[tokio::test]
    async fn leftover_part_beyond_plan_conflicts_without_overwrite() {
        let (_dir, input, out) = scratch();
        std::fs::create_dir_all(&out).unwrap();
        std::fs::write(out.join("movie_part_05.mp4"), vec![0u8; 500]).unwrap();

        let backend = FakeBackend::new(ProbeResult::new(180.0, 150.0, 0.0), vec![50, 50, 50]);
        let splits = backend.splits.clone();
        let reencodes = backend.reencodes.clone();
        let executor = SplitExecutor::with_backend(backend);

        let result = executor
            .execute(&tiny_limits(SplitRequest::new(&input, &out)), &SplitContext::new())
            .await;
        assert_matches!(result, Err(Error::Conflict { ref path }) if path.ends_with("movie_part_05.mp4"));
        assert_eq!(splits.load(Ordering::SeqCst), 0);
        assert_eq!(reencodes.load(Ordering::SeqCst), 0);
        assert_eq!(std::fs::metadata(out.join("movie_part_05.mp4")).unwrap().len(), 500);
    }

    #[tokio::test]
    async fn returned_parts_are_absolute() {
        let (_dir, input, out) = scratch();
        // Non-normalized spelling of the output directory.
        let dotted = out.join("..").join("out");
        std::fs::create_dir_all(&out).unwrap();
        let backend = FakeBackend::new(ProbeResult::new(120.0, 100.0, 0.0), vec![50, 50]);
        let executor = SplitExecutor::with_backend(backend);

        let parts = executor
            .execute(&tiny_limits(SplitRequest::new(&input, &dotted)), &SplitContext::new())
            .await
            .unwrap();
        let canonical = std::fs::canonicalize(&out).unwrap();
        assert!(parts.iter().all(|p| p.is_absolute() && p.parent() == Some(canonical.as_path())));
    }

    #[tokio::test]
    async fn overwrite_removes_stale_parts() {
        let (_dir, input, out) = scratch();
        std::fs::create_dir_all(&out).unwrap();
        std::fs::write(out.join("movie_part_05.mp4"), b"stale").unwrap();
        std::fs::write(out.join("notes.txt"), b"keep").unwrap();

        let backend = FakeBackend::new(ProbeResult::new(120.0, 100.0, 0.0), vec![50, 50]);
        let executor = SplitExecutor::with_backend(backend);

        let request = tiny_limits(SplitRequest::new(&input, &out)).with_overwrite(true);
        let parts = executor.execute(&request, &SplitContext::new()).await.unwrap();

        assert_eq!(names(&parts), vec!["movie_part_01.mp4", "movie_part_02.mp4"]);
        assert!(!out.join("movie_part_05.mp4").exists());
        assert!(out.join("notes.txt").exists());
    }

    #[tokio::test]
    async fn more_parts_than_planned_clamp_progress() {
        let (_dir, input, out) = scratch();
        // Planned 2 parts, segmenter produced 3.
        let backend = FakeBackend::new(ProbeResult::new(120.0, 100.0, 0.0), vec![30, 30, 30]);
        let executor = SplitExecutor::with_backend(backend);

        let (tx, mut rx) = progress_channel();
        let ctx = SplitContext::new().with_progress(tx);
        let parts = executor
            .execute(&tiny_limits(SplitRequest::new(&input, &out)), &ctx)
            .await
            .unwrap();

        assert_eq!(parts.len(), 3);
        let events = drain(&mut rx);
        assert!(events.iter().all(|e| e.completed_parts <= e.total_parts || e.total_parts == 0));
        let last = events.last().unwrap();
        assert_eq!((last.completed_parts, last.total_parts), (2, 2));
    }

    #[tokio::test]
    async fn no_parts_is_tool_error() {
        let (_dir, input, out) = scratch();
        let executor =
            SplitExecutor::with_backend(FakeBackend::new(ProbeResult::new(10.0, 10.0, 0.0), vec![]));
        let result = executor.execute(&SplitRequest::new(&input, &out), &SplitContext::new()).await;
        assert_matches!(result, Err(Error::Tool { .. }));
    }

    #[tokio::test]
    async fn plan_uses_custom_base_name_and_source_extension() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("holiday.mkv");
        std::fs::write(&input, b"x").unwrap();
        let executor = SplitExecutor::with_backend(FakeBackend::new(
            ProbeResult::new(1200.0, 4.0 * GIB, 0.0),
            vec![],
        ));

        let request = SplitRequest::new(&input, dir.path()).with_base_name("trip");
        let prepared = executor.plan(&request, &SplitContext::new()).await.unwrap();
        assert_eq!(prepared.plan.part_count, 3);
        assert_eq!(prepared.extension, ".mkv");
        assert_eq!(
            names(&prepared.output_paths(dir.path())),
            vec!["trip_part_01.mkv", "trip_part_02.mkv", "trip_part_03.mkv"]
        );

        let blank = SplitRequest::new(&input, dir.path()).with_base_name("  ");
        let prepared = executor.plan(&blank, &SplitContext::new()).await.unwrap();
        assert_eq!(prepared.plan.base_name, "holiday");
    }
}
