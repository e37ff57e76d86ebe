//! Configuration loading for the release pipeline.
//!
//! Loads an optional `dist.toml`. Every field has a serde default so a
//! minimal or empty config file is valid.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

/// Environment variable carrying compiler flags to every build.
pub const RUSTFLAGS_VAR: &str = "RUSTFLAGS";

/// Release pipeline configuration.
///
/// Unknown keys are rejected; the artifact naming convention is fixed and
/// cannot be configured here.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// Toolchain channel, e.g. `nightly` or `nightly-2024-05-01`.
    #[serde(default = "default_toolchain")]
    pub toolchain: String,

    /// Value of `RUSTFLAGS` for every build, passed through unmodified.
    #[serde(default = "default_rustflags")]
    pub rustflags: String,

    /// Cargo package that produces the installer binary.
    #[serde(default = "default_package")]
    pub package: String,

    /// Build root, relative to the checkout.
    #[serde(default = "default_target_dir")]
    pub target_dir: PathBuf,

    /// Output directory under the build root.
    #[serde(default = "default_profile")]
    pub profile: String,

    /// Local artifact store.
    #[serde(default = "default_artifacts_dir")]
    pub artifacts_dir: PathBuf,

    /// Per-command timeout for toolchain install and build, in seconds. 0 disables it.
    #[serde(default = "default_step_timeout_secs")]
    pub step_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            toolchain: default_toolchain(),
            rustflags: default_rustflags(),
            package: default_package(),
            target_dir: default_target_dir(),
            profile: default_profile(),
            artifacts_dir: default_artifacts_dir(),
            step_timeout_secs: default_step_timeout_secs(),
        }
    }
}

impl PipelineConfig {
    /// Path of a compiled binary relative to a checkout.
    pub fn output_path(&self, checkout: &Path, binary_name: &str) -> PathBuf {
        checkout
            .join(&self.target_dir)
            .join(&self.profile)
            .join(binary_name)
    }

    /// Cargo invocation for the optimized build.
    ///
    /// A profile other than `release` is passed as `--profile`, so the
    /// output lands where [`PipelineConfig::output_path`] looks for it.
    pub fn build_command(&self) -> String {
        let profile = if self.profile == "release" {
            "--release".to_owned()
        } else {
            format!("--profile {}", self.profile)
        };
        format!(
            "cargo +{} build {profile} -p {}",
            self.toolchain, self.package
        )
    }

    /// Toolchain acquisition command.
    pub fn toolchain_command(&self) -> String {
        format!(
            "rustup toolchain install {} --profile minimal",
            self.toolchain
        )
    }
}

// Default value functions for serde

fn default_toolchain() -> String {
    "nightly".to_owned()
}
fn default_rustflags() -> String {
    "-C target-feature=+crt-static -Z unstable-options".to_owned()
}
fn default_package() -> String {
    "tower-installer".to_owned()
}
fn default_target_dir() -> PathBuf {
    PathBuf::from("target")
}
fn default_profile() -> String {
    "release".to_owned()
}
fn default_artifacts_dir() -> PathBuf {
    PathBuf::from("artifacts")
}
fn default_step_timeout_secs() -> u64 {
    3600
}

/// Load the pipeline config from a TOML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_pipeline_config(path: &Path) -> anyhow::Result<PipelineConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    toml::from_str(&contents).with_context(|| format!("failed to parse {}", path.display()))
}
