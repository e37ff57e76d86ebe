//! Deployment orchestration: preflight checks, then start or stop the stack.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::compose::{render_compose_file, Compose};
use crate::config::InstallerConfig;
use crate::docker::{self, DockerEngine};
use crate::error::InstallerError;
use crate::executor::{shell_quote, ExecOptions, Executor};
use crate::report;
use crate::requirements::{self, RequirementReport, SystemProbe};

/// Compose file inside a tower source checkout.
pub const SOURCE_COMPOSE_FILE: &str = "packages/server/docker-compose.yml";

/// Server package inside a tower source checkout.
pub const SOURCE_SERVER_DIR: &str = "packages/server";

/// Setup script, relative to the server package.
pub const SETUP_SCRIPT: &str = "scripts/setup.js";

/// Where the stack's images come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeploySource {
    /// Images already present (or pullable) on the host.
    Images,
    /// Load images from a `docker save` tarball first.
    Tarball(PathBuf),
    /// Build from a tower source checkout.
    Source(PathBuf),
}

impl DeploySource {
    /// Build a source from the mutually exclusive CLI options.
    ///
    /// `from_source` wins when both are given.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::InvalidPath`] when a relative path cannot be resolved.
    pub fn from_options(
        from_source: Option<&Path>,
        from_tar: Option<&Path>,
        cwd: &Path,
    ) -> Result<Self, InstallerError> {
        if let Some(dir) = from_source {
            return Ok(Self::Source(resolve_path(cwd, dir)?));
        }
        if let Some(tar) = from_tar {
            return Ok(Self::Tarball(resolve_path(cwd, tar)?));
        }
        Ok(Self::Images)
    }
}

/// Resolve a user-supplied path.
///
/// Absolute paths are returned unchanged; relative paths are joined onto
/// `cwd` and canonicalised, so they must exist.
///
/// # Errors
///
/// Returns [`InstallerError::InvalidPath`] when canonicalisation fails.
pub fn resolve_path(cwd: &Path, raw: &Path) -> Result<PathBuf, InstallerError> {
    if raw.is_absolute() {
        return Ok(raw.to_path_buf());
    }
    cwd.join(raw)
        .canonicalize()
        .map_err(|e| InstallerError::InvalidPath {
            path: raw.to_path_buf(),
            reason: e.to_string(),
        })
}

/// Drives checks and docker-compose for one installer invocation.
pub struct Deployer {
    config: InstallerConfig,
    executor: Arc<dyn Executor>,
    engine: Arc<dyn DockerEngine>,
}

impl Deployer {
    /// Create a deployer.
    pub fn new(
        config: InstallerConfig,
        executor: Arc<dyn Executor>,
        engine: Arc<dyn DockerEngine>,
    ) -> Self {
        Self {
            config,
            executor,
            engine,
        }
    }

    fn compose(&self) -> Compose<'_> {
        Compose::new(&self.config.project.name, self.executor.as_ref())
    }

    /// Evaluate, print and enforce hardware requirements.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::RequirementsNotMet`] unless `force` is set.
    pub fn check_requirements(
        &self,
        probe: &dyn SystemProbe,
        force: bool,
    ) -> Result<RequirementReport, InstallerError> {
        println!("> checking hardware requirements...");
        let report = requirements::evaluate(probe, &self.config.requirements);
        report::print_requirements(&report);
        requirements::enforce(&report, force)?;
        Ok(report)
    }

    /// Check docker and docker-compose, then report missing images.
    ///
    /// Returns the missing images; their absence is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error when docker or docker-compose is unavailable.
    pub async fn check_docker(&self) -> Result<Vec<String>, InstallerError> {
        println!("> checking docker and docker-compose...");
        docker::check_docker(self.engine.as_ref(), self.executor.as_ref()).await?;
        println!("docker is running");
        println!("docker-compose was installed");

        let missing = docker::missing_images(self.engine.as_ref(), &self.config.images.all()).await;
        if missing.is_empty() {
            println!("all images exist");
        }
        for image in &missing {
            warn!(image = %image, "image is missing");
            println!("{image} image is missing");
        }
        Ok(missing)
    }

    /// Run every preflight check without starting anything.
    ///
    /// # Errors
    ///
    /// Returns the first failing check.
    pub async fn preflight(
        &self,
        probe: &dyn SystemProbe,
        force: bool,
    ) -> Result<Vec<String>, InstallerError> {
        self.check_requirements(probe, force)?;
        self.check_docker().await
    }

    /// Run preflight checks and start the stack from `source`.
    ///
    /// `force` skips requirement enforcement and resets data on source deploys.
    ///
    /// # Errors
    ///
    /// Returns the first failing check or command.
    pub async fn deploy(
        &self,
        probe: &dyn SystemProbe,
        source: &DeploySource,
        force: bool,
    ) -> Result<(), InstallerError> {
        self.preflight(probe, force).await?;
        println!("> starting tower containers...");
        self.start(source, force).await?;
        info!(project = %self.config.project.name, "tower deployed");
        Ok(())
    }

    /// Start the stack from `source` without preflight checks.
    ///
    /// # Errors
    ///
    /// Returns the first failing command.
    pub async fn start(&self, source: &DeploySource, force: bool) -> Result<(), InstallerError> {
        match source {
            DeploySource::Source(dir) => self.start_from_source(dir, force).await,
            DeploySource::Tarball(tar) => {
                docker::load_images(self.executor.as_ref(), tar).await?;
                self.start_from_images().await
            }
            DeploySource::Images => self.start_from_images().await,
        }
    }

    async fn start_from_images(&self) -> Result<(), InstallerError> {
        let compose_file = render_compose_file(&self.config);
        self.compose().up_from_stdin(&compose_file).await
    }

    async fn start_from_source(&self, source_dir: &Path, force: bool) -> Result<(), InstallerError> {
        self.compose()
            .up_with_file(&source_dir.join(SOURCE_COMPOSE_FILE))
            .await?;

        info!(dir = %source_dir.display(), "building tower from source");
        let build = self
            .executor
            .execute(
                "yarn && yarn lerna run prepublish",
                ExecOptions::inherit().in_dir(source_dir),
            )
            .await?;
        InstallerError::ensure_success("build tower from source code", &build)?;

        let server_dir = source_dir.join(SOURCE_SERVER_DIR);
        let setup = self
            .executor
            .execute(
                &setup_command(&server_dir, force),
                ExecOptions::inherit()
                    .in_dir(&server_dir)
                    .with_env("PRISMA_PORT", self.config.project.prisma_port.to_string()),
            )
            .await?;
        InstallerError::ensure_success("run setup script", &setup)
    }

    /// Stop and remove the stack's containers.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::CommandFailed`] when shutdown fails.
    pub async fn shut_down(&self) -> Result<(), InstallerError> {
        self.compose().down().await
    }
}

/// Command line run in the server package after building from source.
///
/// `force` inserts a prisma data reset between deploy and setup.
pub fn setup_command(server_dir: &Path, force: bool) -> String {
    let setup_script = server_dir.join(SETUP_SCRIPT);
    let node = format!("node {}", shell_quote(&setup_script.to_string_lossy()));
    let mut parts = vec!["yarn prisma deploy"];
    if force {
        parts.push("yarn prisma reset -f");
    }
    parts.push(&node);
    parts.join(" && ")
}
