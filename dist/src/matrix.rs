//! The release build matrix and artifact naming.

use std::collections::HashSet;

use serde::Serialize;

/// Literal embedded between platform and binary in every artifact name.
pub const ARTIFACT_INFIX: &str = "tower";

/// One platform the installer is built for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatrixEntry {
    /// CI runner image the job runs on.
    pub platform_name: String,
    /// File name of the compiled installer on that platform.
    pub binary_name: String,
}

impl MatrixEntry {
    /// Create an entry.
    pub fn new(platform_name: impl Into<String>, binary_name: impl Into<String>) -> Self {
        Self {
            platform_name: platform_name.into(),
            binary_name: binary_name.into(),
        }
    }

    /// `<platform_name>-tower-<binary_name>`.
    pub fn artifact_name(&self) -> String {
        format!(
            "{}-{ARTIFACT_INFIX}-{}",
            self.platform_name, self.binary_name
        )
    }
}

/// Matrix validation failures.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum MatrixError {
    /// Two entries would publish under the same name.
    #[error("artifact name {0} is produced by more than one matrix entry")]
    DuplicateArtifact(String),
    /// The matrix has no entries.
    #[error("build matrix is empty")]
    Empty,
    /// A requested platform is not part of the matrix.
    #[error("platform {0} is not in the build matrix")]
    UnknownPlatform(String),
}

/// The set of platforms built on every push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildMatrix {
    entries: Vec<MatrixEntry>,
}

impl Default for BuildMatrix {
    fn default() -> Self {
        Self {
            entries: vec![
                MatrixEntry::new("ubuntu-latest", "installer"),
                MatrixEntry::new("macos-latest", "installer"),
                MatrixEntry::new("windows-latest", "installer.exe"),
            ],
        }
    }
}

impl BuildMatrix {
    /// Build a matrix, rejecting empty matrices and colliding artifact names.
    ///
    /// # Errors
    ///
    /// Returns [`MatrixError::Empty`] or [`MatrixError::DuplicateArtifact`].
    pub fn new(entries: Vec<MatrixEntry>) -> Result<Self, MatrixError> {
        if entries.is_empty() {
            return Err(MatrixError::Empty);
        }
        let mut seen = HashSet::new();
        for entry in &entries {
            let name = entry.artifact_name();
            if !seen.insert(name.clone()) {
                return Err(MatrixError::DuplicateArtifact(name));
            }
        }
        Ok(Self { entries })
    }

    /// All entries, in definition order.
    pub fn entries(&self) -> &[MatrixEntry] {
        &self.entries
    }

    /// Look up an entry by platform name.
    ///
    /// # Errors
    ///
    /// Returns [`MatrixError::UnknownPlatform`] when no entry matches.
    pub fn entry(&self, platform_name: &str) -> Result<&MatrixEntry, MatrixError> {
        self.entries
            .iter()
            .find(|e| e.platform_name == platform_name)
            .ok_or_else(|| MatrixError::UnknownPlatform(platform_name.to_owned()))
    }

    /// Select entries by platform name, keeping matrix order.
    ///
    /// An empty selection means every entry.
    ///
    /// # Errors
    ///
    /// Returns [`MatrixError::UnknownPlatform`] for the first unknown name.
    pub fn select(&self, platforms: &[String]) -> Result<Vec<MatrixEntry>, MatrixError> {
        if platforms.is_empty() {
            return Ok(self.entries.clone());
        }
        for name in platforms {
            self.entry(name)?;
        }
        Ok(self
            .entries
            .iter()
            .filter(|e| platforms.contains(&e.platform_name))
            .cloned()
            .collect())
    }

    /// JSON consumable as a GitHub Actions `matrix` (`{"include": [...]}`).
    pub fn to_json(&self) -> serde_json::Value {
        let include: Vec<serde_json::Value> = self
            .entries
            .iter()
            .map(|e| {
                serde_json::json!({
                    "os": e.platform_name,
                    "binary": e.binary_name,
                    "artifact": e.artifact_name(),
                })
            })
            .collect();
        serde_json::json!({ "include": include })
    }
}

/// Platform name of the runner image matching the host OS.
pub fn host_platform() -> &'static str {
    if cfg!(target_os = "windows") {
        "windows-latest"
    } else if cfg!(target_os = "macos") {
        "macos-latest"
    } else {
        "ubuntu-latest"
    }
}
