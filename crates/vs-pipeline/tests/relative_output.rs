//! A relative output directory still yields absolute part paths.
//!
//! Lives in its own test binary because it changes the working directory.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use vs_av::{EncodeMode, ReencodeOutcome};
use vs_core::{ProbeResult, SplitPlan, GIB};
use vs_pipeline::{SplitBackend, SplitContext, SplitExecutor, SplitRequest};

/// Writes one small part per planned index.
struct TwoParts;

#[async_trait]
impl SplitBackend for TwoParts {
    async fn probe(&self, _input: &Path, _cancel: &CancellationToken) -> vs_core::Result<ProbeResult> {
        Ok(ProbeResult::new(120.0, 100.0, 0.0))
    }

    async fn copy_split(
        &self,
        _input: &Path,
        output_dir: &Path,
        plan: &SplitPlan,
        extension: &str,
        _cancel: &CancellationToken,
    ) -> vs_core::Result<Vec<PathBuf>> {
        for name in plan.file_names(extension) {
            std::fs::write(output_dir.join(name), b"part")?;
        }
        vs_av::collect_parts(output_dir, plan, extension)
    }

    async fn reencode(
        &self,
        _part: &Path,
        _max_bytes: f64,
        _cancel: &CancellationToken,
    ) -> vs_core::Result<ReencodeOutcome> {
        Ok(ReencodeOutcome {
            mode: EncodeMode::ConstantQuality { crf: 23 },
            final_size_bytes: 0,
            within_limit: true,
        })
    }
}

#[tokio::test]
async fn relative_output_dir_yields_absolute_paths() {
    let dir = tempfile::tempdir().unwrap();
    std::env::set_current_dir(dir.path()).unwrap();
    std::fs::write("movie.mp4", b"source").unwrap();

    let request = SplitRequest::new("movie.mp4", "relparts").with_limits(100.0 / GIB, 1.0);
    let parts = SplitExecutor::with_backend(TwoParts)
        .execute(&request, &SplitContext::new())
        .await
        .unwrap();

    let expected_dir = std::fs::canonicalize(dir.path().join("relparts")).unwrap();
    assert_eq!(parts.len(), 2);
    for part in &parts {
        assert!(part.is_absolute(), "{part:?}");
        assert_eq!(part.parent(), Some(expected_dir.as_path()));
    }
    assert!(parts[0].ends_with("movie_part_01.mp4"));
}
