//! Host shell executor: `sh -c` on unix, `cmd /C` on Windows.

use std::process::Stdio;
use std::time::Instant;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use super::{ExecOptions, ExecResult, Executor, ExecutorError, OutputMode};

/// Executes command lines through the host's shell.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostShell;

impl HostShell {
    /// Create a host shell executor.
    pub fn new() -> Self {
        Self
    }
}

fn shell_command(command: &str) -> Command {
    if cfg!(target_os = "windows") {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", command]);
        cmd
    } else {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", command]);
        cmd
    }
}

fn stdio_for(mode: OutputMode) -> (Stdio, Stdio) {
    match mode {
        OutputMode::Capture => (Stdio::piped(), Stdio::piped()),
        OutputMode::Inherit => (Stdio::inherit(), Stdio::inherit()),
        OutputMode::Discard => (Stdio::null(), Stdio::null()),
    }
}

#[async_trait::async_trait]
impl Executor for HostShell {
    async fn execute(&self, command: &str, opts: ExecOptions) -> Result<ExecResult, ExecutorError> {
        let mut cmd = shell_command(command);
        if let Some(dir) = &opts.working_dir {
            cmd.current_dir(dir);
        }
        for (key, value) in &opts.env {
            cmd.env(key, value);
        }
        let (stdout, stderr) = stdio_for(opts.output);
        cmd.stdout(stdout).stderr(stderr);
        cmd.stdin(if opts.stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });
        cmd.kill_on_drop(true);

        debug!(command = %command, dir = ?opts.working_dir, "spawning command");
        let started = Instant::now();
        let mut child = cmd.spawn().map_err(|e| ExecutorError::Spawn {
            command: command.to_owned(),
            reason: e.to_string(),
        })?;

        if let Some(input) = opts.stdin.as_deref() {
            if let Some(mut pipe) = child.stdin.take() {
                pipe.write_all(input).await.map_err(|e| ExecutorError::Io {
                    command: command.to_owned(),
                    reason: e.to_string(),
                })?;
                // Closing stdin signals EOF to the child.
                drop(pipe);
            }
        }

        let waited = child.wait_with_output();
        let output = match opts.timeout {
            Some(limit) => match tokio::time::timeout(limit, waited).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(command = %command, seconds = limit.as_secs(), "command timed out");
                    return Ok(ExecResult {
                        exit_code: None,
                        stdout: String::new(),
                        stderr: String::new(),
                        timed_out: true,
                        duration: started.elapsed(),
                    });
                }
            },
            None => waited.await,
        }
        .map_err(|e| ExecutorError::Io {
            command: command.to_owned(),
            reason: e.to_string(),
        })?;

        let result = ExecResult {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            timed_out: false,
            duration: started.elapsed(),
        };
        debug!(
            command = %command,
            exit_code = ?result.exit_code,
            elapsed_ms = result.duration.as_millis(),
            "command finished"
        );
        Ok(result)
    }
}
