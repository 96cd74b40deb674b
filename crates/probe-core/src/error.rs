//! Error types shared by the probe-server crates.
//!
//! This module defines `ProbeError`, the single error type returned by the
//! library crates. It is built with `thiserror` so driver code can use `?`
//! on I/O failures while still attaching the context callers need (which
//! tool failed to start, which host failed to resolve).
//!
//! ## Error Hierarchy
//!
//! - **`Configuration`**: semantic problems in the probe or driver
//!   configuration. The tool path itself is never validated up front; a bad
//!   path surfaces as `Spawn` when the driver is activated.
//! - **`Spawn`**: the operating system refused to execute the helper tool.
//! - **`NameResolution`** / **`NoIpv4Address`**: the probe host could not be
//!   turned into a numeric IPv4 address.
//! - **`ReadinessTimeout`**: the helper never started listening.
//! - **`NotActive`** / **`AlreadyActive`**: activation-guard violations.
//!
//! Nothing in this workspace retries on error. Every failure is returned to
//! the caller, which owns the recovery policy.

use std::time::Duration;
use thiserror::Error;

/// Convenience alias for results using [`ProbeError`].
pub type ProbeResult<T> = std::result::Result<T, ProbeError>;

/// Primary error type for probe drivers.
#[derive(Error, Debug)]
pub enum ProbeError {
    /// Configuration validation failed.
    ///
    /// **Error Type**: Permanent - requires fixing the configuration.
    #[error("Configuration validation error: {0}")]
    Configuration(String),

    /// The helper process could not be started.
    ///
    /// Occurs when the tool is missing, not executable, or the OS is out of
    /// process slots. The underlying `io::Error` is kept unmodified.
    ///
    /// **Error Type**: Permanent for this activation attempt.
    ///
    /// **Recovery Strategy**: Install the tool or register the correct path
    /// in the `[tools]` configuration section.
    #[error("Failed to launch '{tool}': {source}")]
    Spawn {
        /// Tool path or name that was executed.
        tool: String,
        /// OS error reported by the spawn.
        #[source]
        source: std::io::Error,
    },

    /// Standard name resolution failed for a host.
    #[error("Failed to resolve host '{host}': {source}")]
    NameResolution {
        /// Host name that was looked up.
        host: String,
        /// Resolver error.
        #[source]
        source: std::io::Error,
    },

    /// The host resolved, but only to non-IPv4 addresses.
    #[error("Host '{host}' has no IPv4 address")]
    NoIpv4Address {
        /// Host name that was looked up.
        host: String,
    },

    /// The helper process did not accept a TCP connection in time.
    ///
    /// **Error Type**: Usually transient (slow probe enumeration), but may
    /// indicate that the probe is not attached.
    #[error("Server at {address} not ready after {timeout:?}")]
    ReadinessTimeout {
        /// Address that was probed.
        address: String,
        /// Total time spent waiting.
        timeout: Duration,
    },

    /// The helper process exited while activation was waiting for it.
    #[error("'{tool}' exited during startup: {status}")]
    ServerExited {
        /// Tool path or name that was executed.
        tool: String,
        /// Exit status as reported by the OS.
        status: String,
    },

    /// An accessor was used while the driver is inactive.
    #[error("Driver '{driver}' is not active")]
    NotActive {
        /// Driver name.
        driver: String,
    },

    /// `activate` was called on an already active driver.
    #[error("Driver '{driver}' is already active")]
    AlreadyActive {
        /// Driver name.
        driver: String,
    },

    /// No free local port could be obtained.
    #[error("Failed to allocate a free port: {0}")]
    PortAllocation(#[source] std::io::Error),

    /// The proxy resolver rejected the binding.
    #[error("Proxy resolution failed: {0}")]
    Proxy(String),

    /// Error raised by injected lifecycle hooks.
    #[error("Lifecycle hook failed: {0}")]
    Lifecycle(String),

    /// Any other I/O failure (killing or reaping the helper).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProbeError {
    /// Whether waiting and trying again could plausibly succeed.
    ///
    /// Only used for reporting; the drivers themselves never retry.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ProbeError::ReadinessTimeout { .. } | ProbeError::PortAllocation(_)
        )
    }
}
