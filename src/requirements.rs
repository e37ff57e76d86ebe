//! Hardware requirement checks run before deployment.
//!
//! The host is measured through a [`SystemProbe`], every measurement is
//! graded against the required and expected tiers, and [`enforce`] turns
//! the resulting report into a go/no-go decision.

use std::net::TcpListener;

use sysinfo::{Disks, System};
use tracing::{debug, info};

use crate::config::RequirementsConfig;
use crate::error::InstallerError;

const GIB: u64 = 1_073_741_824;

/// Source of host measurements.
pub trait SystemProbe {
    /// Number of logical CPU cores.
    fn cpu_cores(&self) -> u32;
    /// Total physical memory in bytes.
    fn total_memory(&self) -> u64;
    /// Available space summed over every mounted disk, in bytes.
    fn available_storage(&self) -> u64;
    /// Whether `port` can be bound on 127.0.0.1.
    fn port_available(&self, port: u16) -> bool;
}

/// Probe backed by `sysinfo` and real socket binds.
#[derive(Debug)]
pub struct HostProbe {
    system: System,
    disks: Disks,
}

impl HostProbe {
    /// Snapshot the current host.
    pub fn new() -> Self {
        let mut system = System::new_all();
        system.refresh_all();
        let disks = Disks::new_with_refreshed_list();
        Self { system, disks }
    }
}

impl Default for HostProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemProbe for HostProbe {
    fn cpu_cores(&self) -> u32 {
        u32::try_from(self.system.cpus().len()).unwrap_or(u32::MAX)
    }

    fn total_memory(&self) -> u64 {
        self.system.total_memory()
    }

    fn available_storage(&self) -> u64 {
        self.disks
            .list()
            .iter()
            .fold(0u64, |sum, disk| sum.saturating_add(disk.available_space()))
    }

    fn port_available(&self, port: u16) -> bool {
        TcpListener::bind(("127.0.0.1", port)).is_ok()
    }
}

/// How a measurement compares to the two thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Grade {
    /// Below the required minimum.
    Insufficient,
    /// At or above required, below expected.
    Acceptable,
    /// At or above expected.
    Recommended,
}

/// Grade `actual` against `required` and `expected`.
pub fn grade(actual: u64, required: u64, expected: u64) -> Grade {
    if actual < required {
        return Grade::Insufficient;
    }
    if actual < expected {
        return Grade::Acceptable;
    }
    Grade::Recommended
}

/// Measured resource kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    /// Logical CPU cores (a count).
    CpuCores,
    /// Total memory (bytes).
    Memory,
    /// Available storage (bytes).
    StorageSpace,
}

impl Resource {
    /// Row label used in reports.
    pub fn label(self) -> &'static str {
        match self {
            Self::CpuCores => "cpu cores",
            Self::Memory => "memory",
            Self::StorageSpace => "storage space",
        }
    }

    /// Message used when the resource is insufficient.
    pub fn shortfall(self) -> &'static str {
        match self {
            Self::CpuCores => "CPU cores not enough",
            Self::Memory => "Memory not enough",
            Self::StorageSpace => "Storage space not enough",
        }
    }

    /// Whether values are byte quantities.
    pub fn is_bytes(self) -> bool {
        !matches!(self, Self::CpuCores)
    }
}

/// One graded measurement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Measurement {
    /// What was measured.
    pub resource: Resource,
    /// Required minimum.
    pub required: u64,
    /// Recommended value.
    pub expected: u64,
    /// Measured value.
    pub actual: u64,
    /// Resulting grade.
    pub grade: Grade,
}

/// Port availability result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortCheck {
    /// Ports that were required to be free.
    pub required: Vec<u16>,
    /// Required ports that could not be bound.
    pub unavailable: Vec<u16>,
}

/// Full result of a requirements evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequirementReport {
    /// CPU, memory and storage measurements, in that order.
    pub measurements: Vec<Measurement>,
    /// Port availability.
    pub ports: PortCheck,
}

impl RequirementReport {
    /// Messages for every unmet requirement, empty when all are met.
    pub fn shortfalls(&self) -> Vec<String> {
        let mut out: Vec<String> = self
            .measurements
            .iter()
            .filter(|m| m.grade == Grade::Insufficient)
            .map(|m| m.resource.shortfall().to_owned())
            .collect();
        if !self.ports.unavailable.is_empty() {
            out.push(format!(
                "Some ports are not available: {}",
                join_ports(&self.ports.unavailable)
            ));
        }
        out
    }

    /// Whether every requirement is met.
    pub fn is_satisfied(&self) -> bool {
        self.shortfalls().is_empty()
    }
}

/// Render a port list as `a, b, c`.
pub fn join_ports(ports: &[u16]) -> String {
    ports
        .iter()
        .map(u16::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Measure the host and grade it against `config`.
pub fn evaluate(probe: &dyn SystemProbe, config: &RequirementsConfig) -> RequirementReport {
    let required = &config.required;
    let expected = &config.expected;

    let measure = |resource: Resource, required: u64, expected: u64, actual: u64| {
        let grade = grade(actual, required, expected);
        debug!(
            resource = resource.label(),
            required,
            expected,
            actual,
            ?grade,
            "measured"
        );
        Measurement {
            resource,
            required,
            expected,
            actual,
            grade,
        }
    };

    let measurements = vec![
        measure(
            Resource::CpuCores,
            u64::from(required.cpu_cores),
            u64::from(expected.cpu_cores),
            u64::from(probe.cpu_cores()),
        ),
        measure(
            Resource::Memory,
            required.memory_gib.saturating_mul(GIB),
            expected.memory_gib.saturating_mul(GIB),
            probe.total_memory(),
        ),
        measure(
            Resource::StorageSpace,
            required.storage_gib.saturating_mul(GIB),
            expected.storage_gib.saturating_mul(GIB),
            probe.available_storage(),
        ),
    ];

    let unavailable = required
        .ports
        .iter()
        .copied()
        .filter(|port| !probe.port_available(*port))
        .collect();

    RequirementReport {
        measurements,
        ports: PortCheck {
            required: required.ports.clone(),
            unavailable,
        },
    }
}

/// Refuse to continue when requirements are unmet, unless `force` is set.
///
/// # Errors
///
/// Returns [`InstallerError::RequirementsNotMet`] listing every shortfall.
pub fn enforce(report: &RequirementReport, force: bool) -> Result<(), InstallerError> {
    let shortfalls = report.shortfalls();
    if shortfalls.is_empty() {
        return Ok(());
    }
    if force {
        info!(?shortfalls, "requirements not met, continuing because --force was given");
        return Ok(());
    }
    Err(InstallerError::RequirementsNotMet(shortfalls))
}
