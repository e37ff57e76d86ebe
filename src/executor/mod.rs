//! Command execution abstractions and implementations.
//!
//! Every external program the installer and the release pipeline drive
//! (`docker`, `docker-compose`, `yarn`, `git`, `rustup`, `cargo`) goes
//! through an [`Executor`], so orchestration code can be exercised against
//! scripted executors in tests.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;

pub mod shell;

/// What to do with the child's stdout and stderr.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputMode {
    /// Capture both streams into [`ExecResult`].
    #[default]
    Capture,
    /// Stream both to the parent's terminal.
    Inherit,
    /// Throw both away.
    Discard,
}

/// Command execution options.
#[derive(Debug, Clone, Default)]
pub struct ExecOptions {
    /// Maximum command runtime. `None` waits indefinitely.
    pub timeout: Option<Duration>,
    /// Working directory for the command.
    pub working_dir: Option<PathBuf>,
    /// Extra environment variables, applied on top of the inherited environment.
    pub env: Vec<(String, String)>,
    /// Bytes written to the child's stdin before it is closed.
    pub stdin: Option<Vec<u8>>,
    /// Output handling.
    pub output: OutputMode,
}

impl ExecOptions {
    /// Options that stream output to the terminal.
    pub fn inherit() -> Self {
        Self {
            output: OutputMode::Inherit,
            ..Self::default()
        }
    }

    /// Options that silence all output.
    pub fn quiet() -> Self {
        Self {
            output: OutputMode::Discard,
            ..Self::default()
        }
    }

    /// Set the working directory.
    #[must_use]
    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Add one environment variable.
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Feed `input` to the child's stdin.
    #[must_use]
    pub fn with_stdin(mut self, input: impl Into<Vec<u8>>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    /// Look up an environment variable set on these options.
    pub fn env_var(&self, key: &str) -> Option<&str> {
        self.env
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Command execution result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecResult {
    /// Process exit code (`None` when the process was killed or exit code unavailable).
    pub exit_code: Option<i32>,
    /// Captured stdout text. Empty unless output was captured.
    pub stdout: String,
    /// Captured stderr text. Empty unless output was captured.
    pub stderr: String,
    /// Whether the command exceeded the timeout.
    pub timed_out: bool,
    /// Wall-clock duration of the execution.
    pub duration: Duration,
}

impl ExecResult {
    /// Returns `true` when the command exited successfully (code 0, no timeout).
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }

    /// Combined stdout+stderr output, separated by a newline when both are non-empty.
    pub fn output(&self) -> String {
        if self.stdout.is_empty() {
            return self.stderr.clone();
        }
        if self.stderr.is_empty() {
            return self.stdout.clone();
        }
        format!("{}\n{}", self.stdout, self.stderr)
    }
}

/// Errors produced by executor operations.
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    /// The shell could not be started.
    #[error("failed to spawn `{command}`: {reason}")]
    Spawn {
        /// Command line that was being started.
        command: String,
        /// Underlying OS error text.
        reason: String,
    },
    /// I/O with a running child failed.
    #[error("i/o error while running `{command}`: {reason}")]
    Io {
        /// Command line that was running.
        command: String,
        /// Underlying OS error text.
        reason: String,
    },
}

/// Runs command lines on behalf of the installer and the release pipeline.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Execute a shell command line with options.
    async fn execute(&self, command: &str, opts: ExecOptions) -> Result<ExecResult, ExecutorError>;
}

/// Quote a single argument for the platform shell used by [`shell::HostShell`].
///
/// POSIX shells get single quotes with embedded quotes escaped; `cmd.exe`
/// gets double quotes.
pub fn shell_quote(raw: &str) -> String {
    if cfg!(target_os = "windows") {
        format!("\"{}\"", raw.replace('"', "\"\""))
    } else {
        let escaped = raw.replace('\'', r"'\''");
        format!("'{escaped}'")
    }
}
