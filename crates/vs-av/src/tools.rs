//! External tool discovery.
//!
//! The [`ToolLocator`] resolves ffmpeg and ffprobe by walking an ordered
//! list of directories: the bundled `third_party/ffmpeg/<platform>/`
//! directory next to the executable, the executable's own directory, then
//! every `PATH` entry. Lookups are not cached and never download or install
//! anything.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;
use vs_core::config::ToolsConfig;
use vs_core::Error;

use crate::command::ToolCommand;
use crate::probe::FfprobeProber;

/// The media tool.
pub const FFMPEG: &str = "ffmpeg";
/// The analysis companion.
pub const FFPROBE: &str = "ffprobe";

/// A resolved tool and the limits applied when running it.
#[derive(Debug, Clone)]
pub struct ToolConfig {
    /// Human-readable tool name (e.g. "ffmpeg").
    pub name: String,
    /// Resolved path to the executable.
    pub path: PathBuf,
    /// Maximum execution time before the tool is killed.
    pub timeout: Duration,
}

/// The pair of tools a split run needs.
#[derive(Debug, Clone)]
pub struct Tools {
    pub ffmpeg: ToolConfig,
    pub ffprobe: ToolConfig,
    /// Time a cancelled process gets to quit before it is killed.
    pub cancel_grace: Duration,
}

impl Tools {
    /// Build from explicit paths with default limits.
    pub fn new(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        let limits = ToolsConfig::default();
        Self {
            ffmpeg: ToolConfig {
                name: FFMPEG.into(),
                path: ffmpeg.into(),
                timeout: limits.process_timeout(),
            },
            ffprobe: ToolConfig {
                name: FFPROBE.into(),
                path: ffprobe.into(),
                timeout: limits.probe_timeout(),
            },
            cancel_grace: limits.cancel_grace(),
        }
    }

    /// Apply timeouts and grace period from configuration.
    pub fn with_limits(mut self, limits: &ToolsConfig) -> Self {
        self.ffmpeg.timeout = limits.process_timeout();
        self.ffprobe.timeout = limits.probe_timeout();
        self.cancel_grace = limits.cancel_grace();
        self
    }

    /// A fresh ffmpeg command with limits applied.
    pub fn ffmpeg_command(&self) -> ToolCommand {
        let mut cmd = ToolCommand::new(self.ffmpeg.path.clone());
        cmd.timeout(self.ffmpeg.timeout).grace_period(self.cancel_grace);
        cmd
    }

    /// A prober backed by the resolved ffprobe.
    pub fn prober(&self) -> FfprobeProber {
        FfprobeProber::new(self.ffprobe.path.clone())
            .with_timeout(self.ffprobe.timeout)
            .with_grace_period(self.cancel_grace)
    }
}

/// Availability information for a tool, returned by [`check_tools`].
#[derive(Debug, Clone, Serialize)]
pub struct ToolInfo {
    /// Tool name.
    pub name: String,
    /// Whether the tool was found.
    pub available: bool,
    /// Version string (first line of `-version` output), if available.
    pub version: Option<String>,
    /// Resolved path to the executable.
    pub path: Option<PathBuf>,
}

/// Resolves tool locations over an ordered, de-duplicated directory list.
#[derive(Debug, Clone)]
pub struct ToolLocator {
    search_dirs: Vec<PathBuf>,
    ffmpeg_override: Option<PathBuf>,
    ffprobe_override: Option<PathBuf>,
}

impl Default for ToolLocator {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolLocator {
    /// Locator over the default search order.
    pub fn new() -> Self {
        Self::with_search_dirs(default_search_dirs())
    }

    /// Locator over an explicit directory list (de-duplicated).
    pub fn with_search_dirs(dirs: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            search_dirs: dedup_dirs(dirs),
            ffmpeg_override: None,
            ffprobe_override: None,
        }
    }

    /// Use configured tool paths first, when they exist.
    pub fn with_overrides(mut self, tools_config: &ToolsConfig) -> Self {
        self.ffmpeg_override = tools_config.ffmpeg_path.clone();
        self.ffprobe_override = tools_config.ffprobe_path.clone();
        self
    }

    /// Directories searched, in order.
    pub fn search_dirs(&self) -> &[PathBuf] {
        &self.search_dirs
    }

    /// Resolve both tools.
    ///
    /// The two may come from different directories.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ToolNotFound`], naming both expected binaries and the
    /// directories searched, if either is unresolved.
    pub fn locate(&self) -> vs_core::Result<Tools> {
        let ffmpeg = self.find(FFMPEG, self.ffmpeg_override.as_deref());
        let ffprobe = self.find(FFPROBE, self.ffprobe_override.as_deref());

        match (ffmpeg, ffprobe) {
            (Some(ffmpeg), Some(ffprobe)) => {
                tracing::debug!(ffmpeg = %ffmpeg.display(), ffprobe = %ffprobe.display(), "Located tools");
                Ok(Tools::new(ffmpeg, ffprobe))
            }
            (ffmpeg, ffprobe) => {
                let missing: Vec<String> = [(FFMPEG, ffmpeg.is_none()), (FFPROBE, ffprobe.is_none())]
                    .into_iter()
                    .filter(|(_, missing)| *missing)
                    .map(|(name, _)| executable_name(name))
                    .collect();
                let searched: String = self
                    .search_dirs
                    .iter()
                    .map(|d| format!("\n- {}", d.display()))
                    .collect();
                Err(Error::ToolNotFound {
                    message: format!(
                        "{} and {} are required but {} could not be located. \
                         Bundle them with the application or add them to PATH. Searched:{}",
                        executable_name(FFMPEG),
                        executable_name(FFPROBE),
                        missing.join(" and "),
                        searched
                    ),
                })
            }
        }
    }

    /// Resolve a single tool, or `None`.
    pub fn find(&self, name: &str, override_path: Option<&Path>) -> Option<PathBuf> {
        if let Some(p) = override_path {
            if p.is_file() {
                return Some(p.to_path_buf());
            }
            tracing::warn!("Configured {name} path {} does not exist; searching", p.display());
        }

        let exe = executable_name(name);
        self.search_dirs
            .iter()
            .find_map(|dir| which::which_in(&exe, Some(dir), dir).ok())
    }
}

/// Platform-appropriate executable file name.
pub fn executable_name(name: &str) -> String {
    if cfg!(windows) {
        format!("{name}.exe")
    } else {
        name.to_string()
    }
}

/// Sub-directory name for bundled binaries, e.g. `win-x64` or `linux-arm64`.
pub fn platform_dir_name() -> String {
    let os = match std::env::consts::OS {
        "windows" => "win",
        "macos" => "osx",
        other => other,
    };
    let arch = match std::env::consts::ARCH {
        "x86_64" => "x64",
        "x86" => "x86",
        "aarch64" => "arm64",
        other => other,
    };
    format!("{os}-{arch}")
}

/// Bundled directory, application directory, then `PATH`.
pub fn default_search_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::new();

    if let Some(app_dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        dirs.push(
            app_dir
                .join("third_party")
                .join("ffmpeg")
                .join(platform_dir_name()),
        );
        dirs.push(app_dir);
    }

    if let Some(path) = std::env::var_os("PATH") {
        dirs.extend(std::env::split_paths(&path));
    }

    dedup_dirs(dirs)
}

/// Drop empty entries and case-insensitive duplicates, keeping first position.
fn dedup_dirs(dirs: impl IntoIterator<Item = PathBuf>) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    dirs.into_iter()
        .filter(|d| !d.as_os_str().is_empty())
        .filter(|d| {
            let key = d
                .to_string_lossy()
                .trim_end_matches(['/', '\\'])
                .to_lowercase();
            seen.insert(key)
        })
        .collect()
}

/// Check both tools and return availability information.
pub fn check_tools(locator: &ToolLocator) -> Vec<ToolInfo> {
    [
        (FFMPEG, locator.ffmpeg_override.as_deref()),
        (FFPROBE, locator.ffprobe_override.as_deref()),
    ]
    .into_iter()
    .map(|(name, override_path)| match locator.find(name, override_path) {
        Some(path) => ToolInfo {
            name: name.to_string(),
            available: true,
            version: detect_version(&path),
            path: Some(path),
        },
        None => ToolInfo {
            name: name.to_string(),
            available: false,
            version: None,
            path: None,
        },
    })
    .collect()
}

/// Run `<tool> -version` and return the first line of stdout.
fn detect_version(path: &Path) -> Option<String> {
    let output = std::process::Command::new(path)
        .arg("-version")
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(|s| s.to_string())
}
