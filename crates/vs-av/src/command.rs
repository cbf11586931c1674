//! Builder for executing external tool commands with timeout and
//! cancellation support.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio_util::sync::CancellationToken;
use vs_core::Error;

/// Default command timeout: 5 minutes.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Default time a cancelled process gets to quit on its own.
const DEFAULT_GRACE: Duration = Duration::from_secs(5);

/// Number of stderr lines kept for error messages.
const STDERR_TAIL_LINES: usize = 40;

/// Output captured from a tool execution.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Process exit status.
    pub status: ExitStatus,
    /// Captured standard output (lossy UTF-8).
    pub stdout: String,
    /// Last lines of standard error.
    pub stderr: String,
}

/// A builder for constructing and executing external tool invocations.
///
/// Both output streams are drained concurrently with waiting for exit, so a
/// chatty process can never stall on a full pipe. Standard error is logged
/// line by line at `debug` level while the process runs.
///
/// # Example
///
/// ```no_run
/// use vs_av::ToolCommand;
/// use std::path::PathBuf;
///
/// # async fn example() -> vs_core::Result<()> {
/// let output = ToolCommand::new(PathBuf::from("ffprobe"))
///     .args(["-v", "error", "-print_format", "json", "-show_format"])
///     .arg("/path/to/video.mp4")
///     .execute()
///     .await?;
/// println!("{}", output.stdout);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
    grace: Duration,
}

enum Waited {
    Exited(std::io::Result<ExitStatus>),
    Cancelled,
    TimedOut,
}

impl ToolCommand {
    /// Create a new command for the given program path.
    pub fn new(program: PathBuf) -> Self {
        Self {
            program,
            args: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
            grace: DEFAULT_GRACE,
        }
    }

    /// Append a single argument.
    pub fn arg(&mut self, s: impl Into<String>) -> &mut Self {
        self.args.push(s.into());
        self
    }

    /// Append multiple arguments.
    pub fn args(&mut self, iter: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.args.extend(iter.into_iter().map(Into::into));
        self
    }

    /// Set the maximum execution time.
    pub fn timeout(&mut self, d: Duration) -> &mut Self {
        self.timeout = d;
        self
    }

    /// Set how long a cancelled process may take to quit before it is killed.
    pub fn grace_period(&mut self, d: Duration) -> &mut Self {
        self.grace = d;
        self
    }

    /// Arguments collected so far.
    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    /// Shell-like rendering of the command line, for logs.
    pub fn display(&self) -> String {
        std::iter::once(self.program.to_string_lossy().to_string())
            .chain(self.args.iter().cloned())
            .map(|a| {
                if a.is_empty() || a.contains(char::is_whitespace) {
                    format!("'{a}'")
                } else {
                    a
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn program_name(&self) -> String {
        self.program
            .file_stem()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.to_string_lossy().to_string())
    }

    /// Execute the command without a cancellation signal.
    pub async fn execute(&self) -> vs_core::Result<ToolOutput> {
        self.execute_cancellable(&CancellationToken::new()).await
    }

    /// Execute the command, capturing stdout and the tail of stderr.
    ///
    /// When `cancel` fires, the process is asked to quit (`q` on stdin, which
    /// ffmpeg honors), given the grace period, then killed.
    ///
    /// # Errors
    ///
    /// - [`vs_core::Error::Cancelled`] if `cancel` fired before or during the run.
    /// - [`vs_core::Error::Tool`] if the process cannot be spawned, times out
    ///   or exits with a non-zero status (message includes stderr).
    pub async fn execute_cancellable(
        &self,
        cancel: &CancellationToken,
    ) -> vs_core::Result<ToolOutput> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let program_name = self.program_name();
        tracing::debug!(tool = %program_name, "Running: {}", self.display());

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|e| Error::tool(&program_name, format!("failed to spawn: {e}")))?;

        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let stdout_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            if let Some(mut out) = stdout {
                let _ = out.read_to_end(&mut buf).await;
            }
            String::from_utf8_lossy(&buf).to_string()
        });

        let log_name = program_name.clone();
        let stderr_task = tokio::spawn(async move {
            let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);
            if let Some(err) = stderr {
                let mut lines = BufReader::new(err).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    tracing::debug!(tool = %log_name, "{line}");
                    if tail.len() == STDERR_TAIL_LINES {
                        tail.pop_front();
                    }
                    tail.push_back(line);
                }
            }
            Vec::from(tail).join("\n")
        });

        let waited = tokio::select! {
            status = child.wait() => Waited::Exited(status),
            _ = cancel.cancelled() => Waited::Cancelled,
            _ = tokio::time::sleep(self.timeout) => Waited::TimedOut,
        };

        let status = match waited {
            Waited::Exited(Ok(status)) => status,
            Waited::Exited(Err(e)) => {
                return Err(Error::tool(
                    program_name,
                    format!("I/O error waiting for process: {e}"),
                ));
            }
            Waited::Cancelled => {
                tracing::info!(tool = %program_name, "Cancellation requested; stopping process");
                self.stop(&mut child, stdin).await;
                return Err(Error::Cancelled);
            }
            Waited::TimedOut => {
                let _ = child.kill().await;
                return Err(Error::tool(
                    program_name,
                    format!("timed out after {:?}", self.timeout),
                ));
            }
        };
        drop(stdin);

        let output = ToolOutput {
            status,
            stdout: stdout_task.await.unwrap_or_default(),
            stderr: stderr_task.await.unwrap_or_default(),
        };

        if !output.status.success() {
            return Err(Error::tool(
                program_name,
                format!(
                    "exited with status {}: {}",
                    output.status,
                    output.stderr.trim()
                ),
            ));
        }

        Ok(output)
    }

    /// Ask the process to quit, then kill it if it outlives the grace period.
    async fn stop(&self, child: &mut Child, stdin: Option<ChildStdin>) {
        if let Some(mut stdin) = stdin {
            let _ = stdin.write_all(b"q\n").await;
            let _ = stdin.flush().await;
        }

        match tokio::time::timeout(self.grace, child.wait()).await {
            Ok(_) => tracing::debug!("Process exited after quit request"),
            Err(_) => {
                tracing::warn!(
                    "Process did not exit within {:?} of cancellation; killing it",
                    self.grace
                );
                if let Err(e) = child.kill().await {
                    tracing::warn!("Failed to kill process: {e}");
                }
            }
        }
    }
}
