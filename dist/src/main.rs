//! tower-dist CLI entry point.
//!
//! Provides `matrix`, `workflow` and `run` subcommands for printing the
//! build matrix, rendering the CI workflow, and running release jobs.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use tower_dist::config::{load_pipeline_config, PipelineConfig};
use tower_dist::matrix::{host_platform, BuildMatrix};
use tower_dist::pipeline::{resolve_head, CheckoutMode, Pipeline};
use tower_dist::summary::print_summary;
use tower_dist::workflow::{is_up_to_date, render_workflow};
use tower_installer::executor::shell::HostShell;
use tower_installer::logging;

/// Release pipeline for the Tower installer.
#[derive(Parser)]
#[command(name = "tower-dist", version, about)]
struct Cli {
    /// Pipeline config file (`dist.toml`).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Also write JSON logs to this directory.
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

/// Available CLI subcommands.
#[derive(Subcommand)]
enum Command {
    /// Print the build matrix as CI-consumable JSON.
    Matrix,
    /// Render the GitHub Actions workflow.
    Workflow {
        /// Write the workflow to this path instead of stdout.
        #[arg(long, conflicts_with = "check")]
        write: Option<PathBuf>,
        /// Fail when the workflow at this path differs from the rendering.
        #[arg(long)]
        check: Option<PathBuf>,
    },
    /// Run release jobs and publish artifacts.
    Run {
        /// Platform to build (repeatable). Defaults to the host's platform.
        #[arg(long = "platform", value_name = "NAME")]
        platforms: Vec<String>,
        /// Run every matrix entry.
        #[arg(long, conflicts_with = "platforms")]
        all: bool,
        /// Build the current tree instead of a fresh checkout per job.
        #[arg(long)]
        in_place: bool,
        /// Repository root.
        #[arg(long, default_value = ".")]
        repo: PathBuf,
        /// Commit to check out (default: HEAD).
        #[arg(long, conflicts_with = "in_place")]
        commit: Option<String>,
        /// Parent directory for per-job checkouts.
        #[arg(long, default_value = "target/dist-work")]
        work_dir: PathBuf,
        /// Artifact store (overrides the config).
        #[arg(long)]
        artifacts: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let _logging_guard = match &cli.log_dir {
        Some(dir) => Some(logging::init_with_file(dir, "tower-dist.log")?),
        None => {
            logging::init_cli();
            None
        }
    };

    let config = match &cli.config {
        Some(path) => load_pipeline_config(path)?,
        None => PipelineConfig::default(),
    };
    let matrix = BuildMatrix::default();

    match cli.command {
        Command::Matrix => {
            println!("{}", serde_json::to_string_pretty(&matrix.to_json())?);
            Ok(())
        }
        Command::Workflow { write, check } => handle_workflow(&matrix, &config, write, check),
        Command::Run {
            platforms,
            all,
            in_place,
            repo,
            commit,
            work_dir,
            artifacts,
        } => {
            let selected = if all {
                matrix.entries().to_vec()
            } else if platforms.is_empty() {
                vec![matrix.entry(host_platform())?.clone()]
            } else {
                matrix.select(&platforms)?
            };
            let options = RunOptions {
                in_place,
                repo,
                commit,
                work_dir,
                artifacts,
            };
            handle_run(config, selected, options).await
        }
    }
}

fn handle_workflow(
    matrix: &BuildMatrix,
    config: &PipelineConfig,
    write: Option<PathBuf>,
    check: Option<PathBuf>,
) -> anyhow::Result<()> {
    let rendered = render_workflow(matrix, config);

    if let Some(path) = check {
        let committed = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        if !is_up_to_date(&committed, &rendered) {
            anyhow::bail!(
                "{} is out of date; regenerate it with `tower-dist workflow --write {}`",
                path.display(),
                path.display()
            );
        }
        info!(path = %path.display(), "workflow is up to date");
        return Ok(());
    }

    match write {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            std::fs::write(&path, rendered)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), "workflow written");
        }
        None => print!("{rendered}"),
    }
    Ok(())
}

/// Options of the `run` subcommand.
struct RunOptions {
    in_place: bool,
    repo: PathBuf,
    commit: Option<String>,
    work_dir: PathBuf,
    artifacts: Option<PathBuf>,
}

async fn handle_run(
    config: PipelineConfig,
    entries: Vec<tower_dist::matrix::MatrixEntry>,
    options: RunOptions,
) -> anyhow::Result<()> {
    let executor = Arc::new(HostShell::new());
    let repo = options
        .repo
        .canonicalize()
        .with_context(|| format!("failed to resolve {}", options.repo.display()))?;

    let checkout = if options.in_place {
        CheckoutMode::InPlace(repo.clone())
    } else {
        let commit = match options.commit {
            Some(commit) => commit,
            None => resolve_head(executor.as_ref(), &repo).await?,
        };
        CheckoutMode::Clone {
            repo: repo.clone(),
            commit,
            work_root: absolutize(&repo, &options.work_dir),
        }
    };

    let artifacts_dir = absolutize(
        &repo,
        options.artifacts.as_deref().unwrap_or(&config.artifacts_dir),
    );
    std::fs::create_dir_all(&artifacts_dir)
        .with_context(|| format!("failed to create {}", artifacts_dir.display()))?;

    info!(
        jobs = entries.len(),
        artifacts = %artifacts_dir.display(),
        "starting release run"
    );
    let pipeline = Pipeline::new(config, executor, checkout, artifacts_dir.clone());
    let report = pipeline.run(entries).await;

    let report_path = artifacts_dir.join("run-report.json");
    if let Err(e) = report.write_json(&report_path) {
        warn!(error = %e, "failed to write run report");
    }
    print_summary(&report);

    if !report.success() {
        anyhow::bail!(
            "{} of {} release jobs failed",
            report.failures().len(),
            report.outcomes.len()
        );
    }
    Ok(())
}

fn absolutize(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
