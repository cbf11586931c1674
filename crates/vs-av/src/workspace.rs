//! In-place file replacement.
//!
//! A [`Workspace`] owns a hidden temporary directory created next to the
//! file being replaced, so the final swap is a same-filesystem rename. The
//! directory and anything left in it are removed when the workspace is
//! dropped, which covers failed and cancelled encodes.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use vs_core::Error;

/// Workspace for replacing one file.
///
/// # Example
///
/// ```no_run
/// use vs_av::Workspace;
///
/// let workspace = Workspace::beside(std::path::Path::new("/out/movie_part_02.mp4")).unwrap();
/// // ... write the replacement to workspace.output() ...
/// workspace.finalize().unwrap();
/// ```
pub struct Workspace {
    temp_dir: TempDir,
    target: PathBuf,
}

impl Workspace {
    /// Create a workspace next to `target`.
    pub fn beside(target: &Path) -> vs_core::Result<Self> {
        let parent = match target.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };

        let temp_dir = tempfile::Builder::new()
            .prefix(".vs-")
            .tempdir_in(parent)
            .map_err(|e| {
                Error::from(std::io::Error::new(
                    e.kind(),
                    format!("failed to create temp dir in {}: {e}", parent.display()),
                ))
            })?;

        Ok(Self {
            temp_dir,
            target: target.to_path_buf(),
        })
    }

    /// The file that will be replaced.
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Where the replacement should be written (same file name as the
    /// target, inside the temp dir).
    pub fn output(&self) -> PathBuf {
        let file_name = self
            .target
            .file_name()
            .unwrap_or_else(|| std::ffi::OsStr::new("output"));
        self.temp_dir.path().join(file_name)
    }

    /// Path to the temporary directory.
    pub fn temp_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Swap the replacement in: delete the target, then rename the output
    /// onto it. Returns the target path.
    ///
    /// # Errors
    ///
    /// Returns an error if the output file does not exist or if the delete
    /// or rename fails.
    pub fn finalize(self) -> vs_core::Result<PathBuf> {
        let output = self.output();
        let dest = &self.target;

        if !output.is_file() {
            return Err(Error::from(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("replacement file does not exist: {}", output.display()),
            )));
        }

        if dest.exists() {
            std::fs::remove_file(dest)?;
        }

        // Rename first (same filesystem), fall back to copy+remove.
        if let Err(rename_err) = std::fs::rename(&output, dest) {
            tracing::debug!("rename failed ({rename_err}); copying instead");
            std::fs::copy(&output, dest)?;
            let _ = std::fs::remove_file(&output);
        }

        Ok(dest.clone())
    }
}
