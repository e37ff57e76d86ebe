//! Tower installer.
//!
//! Checks that a host can run the Tower stack (CPU, memory, disk, ports,
//! docker, docker-compose) and deploys or shuts it down through
//! docker-compose, from prebuilt images, an image tarball or a source
//! checkout.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod executor;
pub mod logging;

pub mod compose;
pub mod deploy;
pub mod docker;
pub mod report;
pub mod requirements;
