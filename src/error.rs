//! Error types for installer operations.

use std::path::PathBuf;

use crate::executor::{ExecResult, ExecutorError};

/// Failures surfaced by the installer's checks and deployment steps.
#[derive(Debug, thiserror::Error)]
pub enum InstallerError {
    /// One or more hardware requirements are below the required minimum.
    #[error("hardware requirements not met: {}", .0.join("; "))]
    RequirementsNotMet(Vec<String>),

    /// The docker daemon cannot be reached.
    #[error("docker is not running: {0}")]
    DockerNotRunning(String),

    /// `docker-compose` is not installed or not on `PATH`.
    #[error("docker-compose was not installed")]
    ComposeMissing,

    /// An external command exited unsuccessfully.
    #[error("{step} failed ({})", describe_exit(.exit_code, .timed_out))]
    CommandFailed {
        /// Human-readable name of the failed step.
        step: String,
        /// Exit code, when the process exited normally.
        exit_code: Option<i32>,
        /// Whether the step was killed after its timeout.
        timed_out: bool,
    },

    /// A user-supplied path could not be resolved.
    #[error("invalid path {}: {reason}", .path.display())]
    InvalidPath {
        /// The path as given.
        path: PathBuf,
        /// Why it could not be resolved.
        reason: String,
    },

    /// Command execution infrastructure failed.
    #[error(transparent)]
    Executor(#[from] ExecutorError),
}

impl InstallerError {
    /// Turn an unsuccessful command result into [`InstallerError::CommandFailed`].
    pub(crate) fn ensure_success(step: &str, result: &ExecResult) -> Result<(), Self> {
        if result.success() {
            return Ok(());
        }
        Err(Self::CommandFailed {
            step: step.to_owned(),
            exit_code: result.exit_code,
            timed_out: result.timed_out,
        })
    }
}

fn describe_exit(exit_code: &Option<i32>, timed_out: &bool) -> String {
    if *timed_out {
        return "timed out".to_owned();
    }
    match exit_code {
        Some(code) => format!("exit code {code}"),
        None => "terminated by signal".to_owned(),
    }
}
