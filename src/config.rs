//! Configuration loading for the installer.
//!
//! Reads `installer.toml` with per-section defaults. All sections use
//! `#[serde(default)]` so a minimal or empty config file is valid, and a
//! missing default file means "use the built-in values".

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level installer configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InstallerConfig {
    /// Hardware thresholds checked before deployment.
    #[serde(default)]
    pub requirements: RequirementsConfig,

    /// docker-compose project settings.
    #[serde(default)]
    pub project: ProjectConfig,

    /// Container images making up the stack.
    #[serde(default)]
    pub images: ImagesConfig,
}

/// Required minimum and recommended hardware.
#[derive(Debug, Clone, Deserialize)]
pub struct RequirementsConfig {
    /// Below these values deployment is refused.
    #[serde(default = "default_required")]
    pub required: HardwareSpec,

    /// Below these values deployment proceeds with a warning.
    #[serde(default = "default_expected")]
    pub expected: HardwareSpec,
}

impl Default for RequirementsConfig {
    fn default() -> Self {
        Self {
            required: default_required(),
            expected: default_expected(),
        }
    }
}

/// One tier of hardware thresholds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HardwareSpec {
    /// Logical CPU cores.
    #[serde(default)]
    pub cpu_cores: u32,

    /// Total memory in GiB.
    #[serde(default)]
    pub memory_gib: u64,

    /// Available storage across all disks in GiB.
    #[serde(default)]
    pub storage_gib: u64,

    /// TCP ports that must be free on 127.0.0.1.
    #[serde(default)]
    pub ports: Vec<u16>,
}

/// docker-compose project settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectConfig {
    /// Compose project name (`docker-compose -p`).
    #[serde(default = "default_project_name")]
    pub name: String,

    /// Port the prisma service listens on.
    #[serde(default = "default_prisma_port")]
    pub prisma_port: u16,

    /// Port the tower server listens on.
    #[serde(default = "default_server_port")]
    pub server_port: u16,

    /// Port openresty serves HTTP on.
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Postgres user shared by postgres and prisma.
    #[serde(default = "default_database_credential")]
    pub database_user: String,

    /// Postgres password shared by postgres and prisma.
    #[serde(default = "default_database_credential")]
    pub database_password: String,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: default_project_name(),
            prisma_port: default_prisma_port(),
            server_port: default_server_port(),
            http_port: default_http_port(),
            database_user: default_database_credential(),
            database_password: default_database_credential(),
        }
    }
}

/// Image references for each service in the stack.
#[derive(Debug, Clone, Deserialize)]
pub struct ImagesConfig {
    /// Tower server image.
    #[serde(default = "default_server_image")]
    pub server: String,

    /// Prisma image.
    #[serde(default = "default_prisma_image")]
    pub prisma: String,

    /// Postgres image.
    #[serde(default = "default_postgres_image")]
    pub postgres: String,

    /// Openresty image.
    #[serde(default = "default_openresty_image")]
    pub openresty: String,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            server: default_server_image(),
            prisma: default_prisma_image(),
            postgres: default_postgres_image(),
            openresty: default_openresty_image(),
        }
    }
}

impl ImagesConfig {
    /// All images in the order they are inspected.
    pub fn all(&self) -> [&str; 4] {
        [
            self.server.as_str(),
            self.prisma.as_str(),
            self.postgres.as_str(),
            self.openresty.as_str(),
        ]
    }
}

// Default value functions for serde

fn default_required() -> HardwareSpec {
    HardwareSpec {
        cpu_cores: 2,
        memory_gib: 4,
        storage_gib: 40,
        ports: vec![default_prisma_port()],
    }
}
fn default_expected() -> HardwareSpec {
    HardwareSpec {
        cpu_cores: 4,
        memory_gib: 8,
        storage_gib: 100,
        ports: Vec::new(),
    }
}
fn default_project_name() -> String {
    "tower".to_owned()
}
fn default_prisma_port() -> u16 {
    8811
}
fn default_server_port() -> u16 {
    8800
}
fn default_http_port() -> u16 {
    80
}
fn default_database_credential() -> String {
    "prisma".to_owned()
}
fn default_server_image() -> String {
    "tower:0.2.3".to_owned()
}
fn default_prisma_image() -> String {
    "prismagraphql/prisma:1.34".to_owned()
}
fn default_postgres_image() -> String {
    "postgres:10.3".to_owned()
}
fn default_openresty_image() -> String {
    "openresty/openresty:alpine".to_owned()
}

/// Load the installer config from a TOML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_config(path: &Path) -> anyhow::Result<InstallerConfig> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read config at {}: {e}", path.display()))?;
    let config: InstallerConfig = toml::from_str(&contents)
        .map_err(|e| anyhow::anyhow!("failed to parse config at {}: {e}", path.display()))?;
    Ok(config)
}

/// Load `~/.tower/installer.toml`, falling back to defaults when it does not exist.
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined or an
/// existing file cannot be parsed.
pub fn load_default_config() -> anyhow::Result<InstallerConfig> {
    let path = config_dir()?.join("installer.toml");
    if !path.exists() {
        return Ok(InstallerConfig::default());
    }
    load_config(&path)
}

/// Resolve the default config directory (`~/.tower/`).
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn config_dir() -> anyhow::Result<PathBuf> {
    let home = directories::BaseDirs::new()
        .ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
    Ok(home.home_dir().join(".tower"))
}
