//! Tower installer CLI entry point.
//!
//! Provides `deploy`, `down` and `check` subcommands.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use tower_installer::config::{load_config, load_default_config, InstallerConfig};
use tower_installer::deploy::{DeploySource, Deployer};
use tower_installer::docker::BollardEngine;
use tower_installer::executor::shell::HostShell;
use tower_installer::logging;
use tower_installer::requirements::HostProbe;

/// Tower Installer.
#[derive(Parser)]
#[command(name = "installer", version, about)]
struct Cli {
    /// Config file (default: ~/.tower/installer.toml when present).
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
    /// Deploy tower service.
    Deploy {
        /// Install tower from source code, please provide the directory of tower source code.
        #[arg(long = "from-source", value_name = "DIR", conflicts_with = "from_tar")]
        from_source: Option<PathBuf>,

        /// Load tower images from a tarball before starting.
        #[arg(long = "from-tar", value_name = "FILE")]
        from_tar: Option<PathBuf>,

        /// Reset data and force deploy a new tower service.
        #[arg(long)]
        force: bool,
    },
    /// Shut down tower service.
    Down,
    /// Run the deploy checks without starting anything.
    Check {
        /// Report unmet hardware requirements without failing.
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let _logging_guard = match &cli.log_dir {
        Some(dir) => Some(logging::init_with_file(dir, "installer.log")?),
        None => {
            logging::init_cli();
            None
        }
    };

    let config = resolve_config(cli.config.as_deref())?;
    let executor = Arc::new(HostShell::new());

    match cli.command {
        Command::Deploy {
            from_source,
            from_tar,
            force,
        } => {
            let cwd = std::env::current_dir().context("failed to get current directory")?;
            let source =
                DeploySource::from_options(from_source.as_deref(), from_tar.as_deref(), &cwd)?;
            let engine = Arc::new(BollardEngine::connect()?);
            let deployer = Deployer::new(config, executor, engine);
            let probe = HostProbe::new();
            info!(?source, force, "deploying");
            deployer.deploy(&probe, &source, force).await?;
        }
        Command::Down => {
            let engine = Arc::new(BollardEngine::connect()?);
            Deployer::new(config, executor, engine).shut_down().await?;
        }
        Command::Check { force } => {
            let engine = Arc::new(BollardEngine::connect()?);
            let deployer = Deployer::new(config, executor, engine);
            let probe = HostProbe::new();
            deployer.preflight(&probe, force).await?;
        }
    }

    Ok(())
}

fn resolve_config(path: Option<&std::path::Path>) -> anyhow::Result<InstallerConfig> {
    match path {
        Some(path) => {
            load_config(path).with_context(|| format!("failed to load {}", path.display()))
        }
        None => load_default_config().context("failed to load default config"),
    }
}
