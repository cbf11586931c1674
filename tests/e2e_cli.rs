//! CLI end-to-end tests
//!
//! Tests for the videosplitter command-line interface. Each test points
//! `VIDEOSPLITTER_HOME` at a scratch directory so settings and logs never
//! land next to the test binary.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::{tempdir, TempDir};

/// Get a command for the videosplitter binary with an isolated home.
#[allow(deprecated)]
fn videosplitter_cmd(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("videosplitter").unwrap();
    cmd.env("VIDEOSPLITTER_HOME", home).env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_cli_no_args_shows_help() {
    let home = tempdir().unwrap();
    videosplitter_cmd(home.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_cli_help_flag() {
    let home = tempdir().unwrap();
    videosplitter_cmd(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("videosplitter"))
        .stdout(predicate::str::contains("Usage"));
}

#[test]
fn test_cli_version_flag() {
    let home = tempdir().unwrap();
    videosplitter_cmd(home.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("videosplitter"));
}

#[test]
fn test_cli_check_tools_command() {
    let home = tempdir().unwrap();
    videosplitter_cmd(home.path())
        .arg("check-tools")
        .assert()
        .success()
        .stdout(predicate::str::contains("ffmpeg").and(predicate::str::contains("ffprobe")));
}

#[test]
fn test_cli_split_help() {
    let home = tempdir().unwrap();
    videosplitter_cmd(home.path())
        .args(["split", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Split a video"))
        .stdout(predicate::str::contains("--max-size-gb"))
        .stdout(predicate::str::contains("--overwrite"));
}

#[test]
fn test_cli_probe_nonexistent_file() {
    let home = tempdir().unwrap();
    videosplitter_cmd(home.path())
        .args(["probe", "/nonexistent/path/movie.mkv"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_cli_validate_bad_config() {
    let home = tempdir().unwrap();
    let config = home.path().join("config.json");
    fs::write(&config, "{ not json").unwrap();

    videosplitter_cmd(home.path())
        .args(["validate", config.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("config parse error"));
}

#[test]
fn test_cli_writes_log_file() {
    let home = tempdir().unwrap();
    videosplitter_cmd(home.path())
        .arg("check-tools")
        .assert()
        .success();
    assert!(home.path().join("logs/app.log").is_file());
}

// ---------------------------------------------------------------------------
// Runs against stand-in tools
// ---------------------------------------------------------------------------

/// Scratch home with stand-in ffmpeg/ffprobe, a config pointing at them and
/// a 280-byte, 180-second "movie".
#[cfg(unix)]
struct FakeSetup {
    home: TempDir,
    config: PathBuf,
    input: PathBuf,
}

#[cfg(unix)]
impl FakeSetup {
    fn new() -> Self {
        use std::os::unix::fs::PermissionsExt;

        let home = tempdir().unwrap();
        let bin = home.path().join("bin");
        fs::create_dir(&bin).unwrap();

        let scripts = [
            (
                "ffmpeg",
                r#"for a in "$@"; do last="$a"; done
case " $* " in
  *" -f segment "*)
    for i in 1 2 3; do head -c 90 /dev/zero > "$(printf "$last" "$i")"; done
    ;;
  *)
    head -c 50 /dev/zero > "$last"
    ;;
esac"#,
            ),
            (
                "ffprobe",
                r#"echo '{"format": {"duration": "180.0", "size": "280", "bit_rate": "12"}}'"#,
            ),
        ];
        for (name, body) in scripts {
            let path = bin.join(name);
            fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        }

        let config = home.path().join("config.json");
        fs::write(
            &config,
            serde_json::json!({
                "tools": {
                    "ffmpeg_path": bin.join("ffmpeg"),
                    "ffprobe_path": bin.join("ffprobe"),
                }
            })
            .to_string(),
        )
        .unwrap();

        let input = home.path().join("movie.mp4");
        fs::write(&input, vec![0u8; 280]).unwrap();

        Self {
            home,
            config,
            input,
        }
    }

    fn cmd(&self) -> Command {
        let mut cmd = videosplitter_cmd(self.home.path());
        cmd.args(["--config", self.config.to_str().unwrap()]);
        cmd
    }

    fn out_dir(&self) -> PathBuf {
        self.home.path().join("out")
    }
}

#[cfg(unix)]
#[test]
fn test_cli_probe_json() {
    let setup = FakeSetup::new();
    setup
        .cmd()
        .args(["probe", "--json", setup.input.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"duration_secs\": 180.0"))
        .stdout(predicate::str::contains("\"file_size_bytes\": 280.0"));
}

#[cfg(unix)]
#[test]
fn test_cli_dry_run_shows_plan_without_writing() {
    let setup = FakeSetup::new();
    setup
        .cmd()
        .args(["split", "--dry-run", "--max-minutes", "1", "-o"])
        .arg(setup.out_dir())
        .arg(&setup.input)
        .assert()
        .success()
        .stdout(predicate::str::contains("Plan: 3 part(s)"))
        .stdout(predicate::str::contains("movie_part_03.mp4"))
        .stdout(predicate::str::contains("[DRY RUN]"));
    assert!(!setup.out_dir().exists());
}

#[cfg(unix)]
#[test]
fn test_cli_split_creates_parts_and_saves_settings() {
    let setup = FakeSetup::new();
    setup
        .cmd()
        .args(["split", "--max-minutes", "1", "--name", "trip", "-o"])
        .arg(setup.out_dir())
        .arg(&setup.input)
        .assert()
        .success()
        .stdout(predicate::str::contains("Created 3 part(s)"));

    for i in 1..=3 {
        assert!(setup.out_dir().join(format!("trip_part_{i:02}.mp4")).is_file());
    }

    let settings: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(setup.home.path().join("settings.json")).unwrap())
            .unwrap();
    assert_eq!(settings["max_duration_minutes"], 1.0);
    assert_eq!(settings["input_path"], setup.input.to_str().unwrap());

    // Same names again without --overwrite collide.
    setup
        .cmd()
        .args(["split", "--max-minutes", "1", "--name", "trip", "-o"])
        .arg(setup.out_dir())
        .arg(&setup.input)
        .assert()
        .code(5)
        .stderr(predicate::str::contains("already exists"));
}

#[cfg(unix)]
#[test]
fn test_cli_overwrite_applies_to_one_run_only() {
    let setup = FakeSetup::new();
    let split = |extra: &[&str]| {
        let mut cmd = setup.cmd();
        cmd.args(["split", "--max-minutes", "1", "-o"])
            .arg(setup.out_dir())
            .args(extra)
            .arg(&setup.input);
        cmd
    };

    split(&[]).assert().success();
    split(&["--overwrite"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created 3 part(s)"));

    let settings = fs::read_to_string(setup.home.path().join("settings.json")).unwrap();
    assert!(!settings.contains("overwrite"), "{settings}");

    // The next run without the flag is back to refusing collisions.
    split(&[])
        .assert()
        .code(5)
        .stderr(predicate::str::contains("already exists"));
}

#[cfg(unix)]
#[test]
fn test_cli_split_rejects_zero_limit() {
    let setup = FakeSetup::new();
    setup
        .cmd()
        .args(["split", "--max-size-gb", "0"])
        .arg(&setup.input)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("out of range"));
}
