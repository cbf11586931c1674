//! Last-used split settings, persisted as `settings.json` in the runtime
//! directory.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use vs_core::plan::{DEFAULT_MAX_GIGABYTES, DEFAULT_MAX_MINUTES};

/// File name of the settings file inside the runtime directory.
pub const SETTINGS_FILE: &str = "settings.json";

/// Environment variable that overrides the runtime directory.
pub const HOME_ENV: &str = "VIDEOSPLITTER_HOME";

/// Directory holding settings, logs and the default output directory: the
/// executable's directory unless `VIDEOSPLITTER_HOME` is set.
pub fn runtime_dir() -> PathBuf {
    if let Some(home) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
        return PathBuf::from(home);
    }
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub input_path: Option<PathBuf>,
    /// Relative paths are resolved against the runtime directory on load.
    pub output_dir: PathBuf,
    pub max_size_gb: f64,
    pub max_duration_minutes: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            input_path: None,
            output_dir: PathBuf::from("split"),
            max_size_gb: DEFAULT_MAX_GIGABYTES,
            max_duration_minutes: DEFAULT_MAX_MINUTES,
        }
    }
}

impl Settings {
    /// Load `path`, writing defaults there first if it does not exist. A
    /// corrupt file is replaced in memory by defaults and left untouched on
    /// disk.
    pub fn load_or_create(path: &Path, runtime_dir: &Path) -> Self {
        let settings = match std::fs::read_to_string(path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("Ignoring unreadable settings {}: {e}", path.display());
                Self::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let defaults = Self::default().resolved(runtime_dir);
                if let Err(e) = defaults.save(path) {
                    tracing::warn!("Failed to create settings {}: {e}", path.display());
                }
                defaults
            }
            Err(e) => {
                tracing::warn!("Failed to read settings {}: {e}", path.display());
                Self::default()
            }
        };
        settings.resolved(runtime_dir)
    }

    fn resolved(mut self, runtime_dir: &Path) -> Self {
        if self.output_dir.is_relative() {
            self.output_dir = runtime_dir.join(&self.output_dir);
        }
        self
    }

    /// Write atomically: a temporary file in the same directory is renamed
    /// over `path`.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut tmp, self)?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        tmp.persist(path)?;
        Ok(())
    }
}
