//! Release job runner.
//!
//! Every matrix entry runs as its own tokio task through five steps:
//! checkout, toolchain, build, locate, publish. A failing step ends that
//! job only; sibling jobs always run to completion and publish.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, info_span, warn, Instrument};

use tower_installer::executor::{shell_quote, ExecOptions, ExecResult, Executor};

use crate::config::{PipelineConfig, RUSTFLAGS_VAR};
use crate::matrix::MatrixEntry;

/// Lines of compiler output kept in a compile failure.
const DIAGNOSTIC_TAIL_LINES: usize = 40;

/// Job steps, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Step {
    /// Clean checkout of the commit.
    Checkout,
    /// Toolchain acquisition.
    Toolchain,
    /// Optimized, statically linked build.
    Build,
    /// Finding the compiled binary.
    Locate,
    /// Copying the binary into the artifact store.
    Publish,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Checkout => "checkout",
            Self::Toolchain => "toolchain",
            Self::Build => "build",
            Self::Locate => "locate",
            Self::Publish => "publish",
        };
        f.write_str(name)
    }
}

/// Why a job failed.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum JobError {
    /// The repository could not be checked out at the commit.
    #[error("checkout failed: {0}")]
    Checkout(String),
    /// The toolchain channel could not be installed.
    #[error("toolchain {channel} unavailable: {detail}")]
    Toolchain {
        /// Requested channel.
        channel: String,
        /// Installer output.
        detail: String,
    },
    /// The build failed.
    #[error("compilation failed:\n{diagnostics}")]
    Compile {
        /// Tail of the compiler output.
        diagnostics: String,
    },
    /// The build reported success but the binary is absent or empty.
    #[error("expected build output {} is missing", .path.display())]
    MissingArtifact {
        /// Where the binary should have been.
        path: PathBuf,
    },
    /// Copying into the artifact store failed.
    #[error("failed to publish {artifact}: {reason}")]
    Publish {
        /// Artifact name.
        artifact: String,
        /// Underlying I/O error text.
        reason: String,
    },
    /// The job task ended without producing an outcome.
    #[error("job aborted: {0}")]
    Aborted(String),
}

impl JobError {
    /// Step the failure belongs to; `None` when the job task itself died.
    pub fn step(&self) -> Option<Step> {
        match self {
            Self::Checkout(_) => Some(Step::Checkout),
            Self::Toolchain { .. } => Some(Step::Toolchain),
            Self::Compile { .. } => Some(Step::Build),
            Self::MissingArtifact { .. } => Some(Step::Locate),
            Self::Publish { .. } => Some(Step::Publish),
            Self::Aborted(_) => None,
        }
    }

    /// Short label for summaries: `failed: <step>` or `aborted`.
    pub fn label(&self) -> String {
        match self.step() {
            Some(step) => format!("failed: {step}"),
            None => "aborted".to_owned(),
        }
    }
}

/// A binary copied into the artifact store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishedArtifact {
    /// Artifact name (`<platform>-tower-<binary>`).
    pub name: String,
    /// Path of the single published file.
    pub path: PathBuf,
    /// File size in bytes.
    pub size: u64,
}

/// Result of one matrix entry.
#[derive(Debug, Clone)]
pub struct JobOutcome {
    /// The entry that ran.
    pub entry: MatrixEntry,
    /// Published artifact or failure.
    pub result: Result<PublishedArtifact, JobError>,
    /// Wall-clock job duration.
    pub duration: Duration,
    /// When the job finished.
    pub finished_at: DateTime<Utc>,
}

impl JobOutcome {
    /// Whether the job published its artifact.
    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }
}

/// Serializable view of a [`JobOutcome`].
#[derive(Debug, Serialize)]
struct JobRecord<'a> {
    platform: &'a str,
    binary: &'a str,
    artifact: String,
    status: &'static str,
    failed_step: Option<Step>,
    error: Option<String>,
    published: Option<&'a PublishedArtifact>,
    duration_ms: u64,
    finished_at: DateTime<Utc>,
}

/// Outcome of a pipeline run, in matrix order.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Commit that was built, when known.
    pub commit: Option<String>,
    /// One outcome per entry.
    pub outcomes: Vec<JobOutcome>,
}

impl RunReport {
    /// The run succeeds only when every job succeeded.
    pub fn success(&self) -> bool {
        self.outcomes.iter().all(JobOutcome::succeeded)
    }

    /// Artifacts published by successful jobs.
    pub fn published(&self) -> Vec<&PublishedArtifact> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok())
            .collect()
    }

    /// Outcomes of failed jobs.
    pub fn failures(&self) -> Vec<&JobOutcome> {
        self.outcomes.iter().filter(|o| !o.succeeded()).collect()
    }

    /// JSON document describing the run.
    pub fn to_json(&self) -> serde_json::Value {
        let jobs: Vec<JobRecord<'_>> = self
            .outcomes
            .iter()
            .map(|o| JobRecord {
                platform: &o.entry.platform_name,
                binary: &o.entry.binary_name,
                artifact: o.entry.artifact_name(),
                status: match &o.result {
                    Ok(_) => "published",
                    Err(JobError::Aborted(_)) => "aborted",
                    Err(_) => "failed",
                },
                failed_step: o.result.as_ref().err().and_then(JobError::step),
                error: o.result.as_ref().err().map(ToString::to_string),
                published: o.result.as_ref().ok(),
                duration_ms: u64::try_from(o.duration.as_millis()).unwrap_or(u64::MAX),
                finished_at: o.finished_at,
            })
            .collect();
        serde_json::json!({
            "commit": self.commit,
            "success": self.success(),
            "jobs": jobs,
        })
    }

    /// Write [`RunReport::to_json`] to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be written.
    pub fn write_json(&self, path: &Path) -> anyhow::Result<()> {
        let rendered = serde_json::to_string_pretty(&self.to_json())?;
        std::fs::write(path, rendered)
            .map_err(|e| anyhow::anyhow!("failed to write {}: {e}", path.display()))
    }
}

/// How each job obtains its source tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutMode {
    /// Build the tree at this path as-is (CI has already checked it out).
    InPlace(PathBuf),
    /// Clone `repo` into `work_root/<platform>` and detach at `commit`.
    Clone {
        /// Repository to clone from.
        repo: PathBuf,
        /// Commit to build.
        commit: String,
        /// Parent directory of per-job checkouts.
        work_root: PathBuf,
    },
}

/// Runs matrix entries through the release steps.
#[derive(Clone)]
pub struct Pipeline {
    config: Arc<PipelineConfig>,
    executor: Arc<dyn Executor>,
    checkout: CheckoutMode,
    artifacts_dir: PathBuf,
}

impl Pipeline {
    /// Create a pipeline publishing into `artifacts_dir`.
    pub fn new(
        config: PipelineConfig,
        executor: Arc<dyn Executor>,
        checkout: CheckoutMode,
        artifacts_dir: PathBuf,
    ) -> Self {
        Self {
            config: Arc::new(config),
            executor,
            checkout,
            artifacts_dir,
        }
    }

    /// Run every entry concurrently and collect outcomes in entry order.
    ///
    /// A job that panics is reported as [`JobError::Aborted`]; it does not
    /// affect its siblings.
    pub async fn run(&self, entries: Vec<MatrixEntry>) -> RunReport {
        let mut handles = Vec::with_capacity(entries.len());
        for entry in entries {
            let pipeline = self.clone();
            let task_entry = entry.clone();
            let handle = tokio::spawn(async move { pipeline.run_job(&task_entry).await });
            handles.push((entry, handle));
        }

        let mut outcomes = Vec::with_capacity(handles.len());
        for (entry, handle) in handles {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(platform = %entry.platform_name, error = %e, "job task failed");
                    JobOutcome {
                        entry,
                        result: Err(JobError::Aborted(e.to_string())),
                        duration: Duration::ZERO,
                        finished_at: Utc::now(),
                    }
                }
            };
            outcomes.push(outcome);
        }

        let commit = match &self.checkout {
            CheckoutMode::Clone { commit, .. } => Some(commit.clone()),
            CheckoutMode::InPlace(_) => None,
        };
        RunReport { commit, outcomes }
    }

    /// Run one entry through every step.
    pub async fn run_job(&self, entry: &MatrixEntry) -> JobOutcome {
        let span = info_span!(
            "job",
            platform = %entry.platform_name,
            artifact = %entry.artifact_name()
        );
        async {
            let started = Instant::now();
            let result = self.execute_steps(entry).await;
            match &result {
                Ok(artifact) => info!(path = %artifact.path.display(), size = artifact.size, "artifact published"),
                Err(e) => error!(outcome = %e.label(), error = %e, "job failed"),
            }
            JobOutcome {
                entry: entry.clone(),
                result,
                duration: started.elapsed(),
                finished_at: Utc::now(),
            }
        }
        .instrument(span)
        .await
    }

    async fn execute_steps(&self, entry: &MatrixEntry) -> Result<PublishedArtifact, JobError> {
        self.retract(entry).await?;
        let tree = self.checkout(entry).await?;
        self.acquire_toolchain().await?;
        self.build(&tree).await?;
        let output = self.locate(&tree, entry)?;
        self.publish(entry, &output).await
    }

    fn step_timeout(&self) -> Option<Duration> {
        match self.config.step_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    async fn run_captured(
        &self,
        command: &str,
        opts: ExecOptions,
    ) -> Result<ExecResult, String> {
        self.executor
            .execute(command, opts)
            .await
            .map_err(|e| e.to_string())
    }

    async fn checkout(&self, entry: &MatrixEntry) -> Result<PathBuf, JobError> {
        let (repo, commit, work_root) = match &self.checkout {
            CheckoutMode::InPlace(tree) => {
                info!(tree = %tree.display(), "building in place");
                return Ok(tree.clone());
            }
            CheckoutMode::Clone {
                repo,
                commit,
                work_root,
            } => (repo, commit, work_root),
        };

        let dest = work_root.join(&entry.platform_name);
        if dest.exists() {
            tokio::fs::remove_dir_all(&dest)
                .await
                .map_err(|e| JobError::Checkout(format!("cannot clear {}: {e}", dest.display())))?;
        }
        tokio::fs::create_dir_all(work_root)
            .await
            .map_err(|e| JobError::Checkout(format!("cannot create {}: {e}", work_root.display())))?;

        info!(commit = %commit, dest = %dest.display(), "checking out");
        let clone = format!(
            "git clone --quiet --no-hardlinks {} {}",
            shell_quote(&repo.to_string_lossy()),
            shell_quote(&dest.to_string_lossy())
        );
        let result = self
            .run_captured(&clone, ExecOptions::default())
            .await
            .map_err(JobError::Checkout)?;
        if !result.success() {
            return Err(JobError::Checkout(result.output().trim().to_owned()));
        }

        let detach = format!("git checkout --quiet --detach {}", shell_quote(commit));
        let result = self
            .run_captured(&detach, ExecOptions::default().in_dir(&dest))
            .await
            .map_err(JobError::Checkout)?;
        if !result.success() {
            return Err(JobError::Checkout(result.output().trim().to_owned()));
        }
        Ok(dest)
    }

    async fn acquire_toolchain(&self) -> Result<(), JobError> {
        let channel = &self.config.toolchain;
        info!(channel = %channel, "acquiring toolchain");
        let opts = ExecOptions {
            timeout: self.step_timeout(),
            ..ExecOptions::default()
        };
        let result = self
            .run_captured(&self.config.toolchain_command(), opts)
            .await
            .map_err(|detail| JobError::Toolchain {
                channel: channel.clone(),
                detail,
            })?;
        if !result.success() {
            return Err(JobError::Toolchain {
                channel: channel.clone(),
                detail: result.output().trim().to_owned(),
            });
        }
        Ok(())
    }

    async fn build(&self, tree: &Path) -> Result<(), JobError> {
        info!(rustflags = %self.config.rustflags, "building release binary");
        let opts = ExecOptions {
            timeout: self.step_timeout(),
            ..ExecOptions::default()
                .in_dir(tree)
                .with_env(RUSTFLAGS_VAR, self.config.rustflags.clone())
        };
        let result = self
            .run_captured(&self.config.build_command(), opts)
            .await
            .map_err(|diagnostics| JobError::Compile { diagnostics })?;
        if !result.success() {
            let diagnostics = if result.timed_out {
                "build timed out".to_owned()
            } else {
                tail_lines(&result.output(), DIAGNOSTIC_TAIL_LINES)
            };
            return Err(JobError::Compile { diagnostics });
        }
        Ok(())
    }

    fn locate(&self, tree: &Path, entry: &MatrixEntry) -> Result<PathBuf, JobError> {
        let path = self.config.output_path(tree, &entry.binary_name);
        match std::fs::metadata(&path) {
            Ok(meta) if meta.is_file() && meta.len() > 0 => Ok(path),
            Ok(_) => {
                warn!(path = %path.display(), "build output is empty or not a file");
                Err(JobError::MissingArtifact { path })
            }
            Err(_) => Err(JobError::MissingArtifact { path }),
        }
    }

    /// Remove the artifact a previous run published for `entry`.
    ///
    /// Runs before any other step so a failing job leaves nothing behind.
    async fn retract(&self, entry: &MatrixEntry) -> Result<(), JobError> {
        let name = entry.artifact_name();
        let dir = self.artifacts_dir.join(&name);
        if !dir.exists() {
            return Ok(());
        }
        info!(dir = %dir.display(), "removing previous artifact");
        tokio::fs::remove_dir_all(&dir)
            .await
            .map_err(|e| JobError::Publish {
                artifact: name,
                reason: e.to_string(),
            })
    }

    async fn publish(
        &self,
        entry: &MatrixEntry,
        output: &Path,
    ) -> Result<PublishedArtifact, JobError> {
        let name = entry.artifact_name();
        let publish_err = |reason: String| JobError::Publish {
            artifact: name.clone(),
            reason,
        };

        let dest_dir = self.artifacts_dir.join(&name);
        tokio::fs::create_dir_all(&dest_dir)
            .await
            .map_err(|e| publish_err(e.to_string()))?;

        let dest = dest_dir.join(&entry.binary_name);
        let size = tokio::fs::copy(output, &dest)
            .await
            .map_err(|e| publish_err(e.to_string()))?;

        Ok(PublishedArtifact {
            name: name.clone(),
            path: dest,
            size,
        })
    }
}

/// Resolve `HEAD` of `repo` to a commit id.
///
/// # Errors
///
/// Returns an error when git cannot resolve the commit.
pub async fn resolve_head(executor: &dyn Executor, repo: &Path) -> anyhow::Result<String> {
    let result = executor
        .execute("git rev-parse HEAD", ExecOptions::default().in_dir(repo))
        .await?;
    if !result.success() {
        anyhow::bail!("git rev-parse HEAD failed: {}", result.output().trim());
    }
    Ok(result.stdout.trim().to_owned())
}

/// Keep the last `max` lines of `text`.
pub fn tail_lines(text: &str, max: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(max);
    lines.get(start..).unwrap_or_default().join("\n")
}
