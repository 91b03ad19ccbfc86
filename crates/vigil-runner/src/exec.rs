use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::process::Command;

use vigil_core::{CommandOutcome, VigilError};

/// A shell command to run for one check.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use vigil_runner::RunRequest;
///
/// let request = RunRequest::new("swift build 2>&1")
///     .timeout(Duration::from_secs(600));
/// assert_eq!(request.command, "swift build 2>&1");
/// ```
#[derive(Debug, Clone)]
pub struct RunRequest {
    /// Command line, passed to `sh -c`.
    pub command: String,
    /// Working directory; inherits the current directory when unset.
    pub cwd: Option<PathBuf>,
    /// Kill the command after this long.
    pub timeout: Option<Duration>,
}

impl RunRequest {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            cwd: None,
            timeout: None,
        }
    }

    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn timeout(mut self, limit: Duration) -> Self {
        self.timeout = Some(limit);
        self
    }
}

/// Run a command through the shell and capture its output.
///
/// Stdout and stderr are captured separately; stdin is closed. When the
/// request carries a timeout and the command exceeds it, the child is
/// killed and the outcome reports `timed_out` with no captured output.
///
/// # Errors
///
/// Returns [`VigilError::Command`] if the shell itself cannot be spawned.
/// A non-zero exit from the command is not an error; it is reported in
/// the outcome so tolerated failures can still feed their logs downstream.
pub async fn run(request: &RunRequest) -> Result<CommandOutcome, VigilError> {
    let mut command = Command::new("sh");
    command
        .arg("-c")
        .arg(&request.command)
        .stdin(Stdio::null())
        .kill_on_drop(true);
    if let Some(dir) = &request.cwd {
        command.current_dir(dir);
    }

    let started = Instant::now();
    let output_future = command.output();

    let spawned = match request.timeout {
        Some(limit) => match tokio::time::timeout(limit, output_future).await {
            Ok(result) => result,
            Err(_) => {
                // The dropped future kills the child via kill_on_drop.
                return Ok(CommandOutcome {
                    exit_code: None,
                    stdout: String::new(),
                    stderr: String::new(),
                    duration_ms: started.elapsed().as_millis() as u64,
                    timed_out: true,
                });
            }
        },
        None => output_future.await,
    };

    let output =
        spawned.map_err(|e| VigilError::Command(format!("failed to launch shell: {e}")))?;

    Ok(CommandOutcome {
        exit_code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        duration_ms: started.elapsed().as_millis() as u64,
        timed_out: false,
    })
}
