//! Docker daemon, docker-compose and image checks.
//!
//! Daemon reachability and image inspection talk to the Engine API through
//! `bollard`; `docker-compose` and `docker load` are driven as commands
//! through an [`Executor`].

use std::path::Path;

use async_trait::async_trait;
use bollard::errors::Error as BollardError;
use bollard::Docker;
use tracing::{debug, info, warn};

use crate::error::InstallerError;
use crate::executor::{shell_quote, ExecOptions, Executor};

/// The subset of the Docker Engine the installer needs.
#[async_trait]
pub trait DockerEngine: Send + Sync {
    /// Succeeds when the daemon answers.
    async fn ping(&self) -> Result<(), InstallerError>;
    /// Whether `image` is present locally.
    async fn image_exists(&self, image: &str) -> Result<bool, InstallerError>;
}

/// [`DockerEngine`] backed by the local daemon socket.
#[derive(Debug, Clone)]
pub struct BollardEngine {
    docker: Docker,
}

impl BollardEngine {
    /// Connect using the platform's default socket or named pipe.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::DockerNotRunning`] when no client can be built.
    pub fn connect() -> Result<Self, InstallerError> {
        let docker = Docker::connect_with_local_defaults()
            .map_err(|e| InstallerError::DockerNotRunning(e.to_string()))?;
        Ok(Self { docker })
    }
}

#[async_trait]
impl DockerEngine for BollardEngine {
    async fn ping(&self) -> Result<(), InstallerError> {
        self.docker
            .ping()
            .await
            .map(|_| ())
            .map_err(|e| InstallerError::DockerNotRunning(e.to_string()))
    }

    async fn image_exists(&self, image: &str) -> Result<bool, InstallerError> {
        match self.docker.inspect_image(image).await {
            Ok(_) => Ok(true),
            Err(BollardError::DockerResponseServerError {
                status_code: 404, ..
            }) => Ok(false),
            Err(err) => Err(InstallerError::DockerNotRunning(err.to_string())),
        }
    }
}

/// Verify the daemon is reachable and `docker-compose` is installed.
///
/// # Errors
///
/// Returns [`InstallerError::DockerNotRunning`] or [`InstallerError::ComposeMissing`].
pub async fn check_docker(
    engine: &dyn DockerEngine,
    executor: &dyn Executor,
) -> Result<(), InstallerError> {
    engine.ping().await?;
    info!("docker is running");

    let result = executor
        .execute("docker-compose version", ExecOptions::quiet())
        .await;
    match result {
        Ok(r) if r.success() => {
            info!("docker-compose is installed");
            Ok(())
        }
        Ok(r) => {
            debug!(exit_code = ?r.exit_code, "docker-compose version failed");
            Err(InstallerError::ComposeMissing)
        }
        Err(e) => {
            debug!(error = %e, "docker-compose could not be started");
            Err(InstallerError::ComposeMissing)
        }
    }
}

/// Return the images from `images` that are not present locally.
///
/// An inspection error counts the image as missing.
pub async fn missing_images(engine: &dyn DockerEngine, images: &[&str]) -> Vec<String> {
    let mut missing = Vec::new();
    for image in images {
        match engine.image_exists(image).await {
            Ok(true) => debug!(image = %image, "image present"),
            Ok(false) => missing.push((*image).to_owned()),
            Err(e) => {
                warn!(image = %image, error = %e, "image inspection failed");
                missing.push((*image).to_owned());
            }
        }
    }
    missing
}

/// Load images from a `docker save` tarball.
///
/// # Errors
///
/// Returns [`InstallerError::CommandFailed`] when `docker load` fails.
pub async fn load_images(executor: &dyn Executor, tarball: &Path) -> Result<(), InstallerError> {
    let command = format!(
        "docker load --input {}",
        shell_quote(&tarball.to_string_lossy())
    );
    info!(tarball = %tarball.display(), "loading docker images");
    let result = executor.execute(&command, ExecOptions::inherit()).await?;
    InstallerError::ensure_success("docker load", &result)
}
