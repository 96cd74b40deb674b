//! # Probe Server Library
//!
//! This crate is the application layer of `probe-server`. It exposes a USB
//! debug probe over the network by running the vendor's remote server for
//! it, using the driver crates of this workspace.
//!
//! ## Crate Structure
//!
//! - **`app`**: builds a driver from configuration and runs one serving cycle.
//! - **`config`**: loads [`config::AppConfig`] from TOML and the environment
//!   with `figment`.
//! - **`logging`**: `tracing-subscriber` initialisation.
//!
//! Driver-level types are re-exported from `probe-core` and
//! `probe-driver-jlink`.

pub mod app;
pub mod config;
pub mod logging;

pub use probe_core::{ProbeBinding, ProbeError, ProbeKind, ProbeResult, ToolRegistry};
pub use probe_driver_jlink::{JLinkDriver, JLinkDriverConfig, Readiness};
