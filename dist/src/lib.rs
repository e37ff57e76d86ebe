//! Release pipeline for the Tower installer.
//!
//! Builds the `installer` binary for every platform of the build matrix
//! with a statically linked runtime and publishes one artifact per
//! platform. The same matrix renders the GitHub Actions workflow that runs
//! the pipeline on every push.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Pipeline configuration (`dist.toml`).
pub mod config;
/// Build matrix and artifact naming.
pub mod matrix;
/// Per-platform job runner.
pub mod pipeline;
/// Run summary tables.
pub mod summary;
/// GitHub Actions workflow rendering.
pub mod workflow;
