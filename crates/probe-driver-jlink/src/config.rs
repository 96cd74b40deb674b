//! Driver configuration.
//!
//! ```toml
//! capture_output = false
//!
//! [readiness]
//! mode = "connect_probe"
//! timeout = "5s"
//! interval = "100ms"
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default time allowed for the server to start listening.
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(5);

/// Default delay between connection attempts.
pub const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_millis(100);

/// Default delay for [`Readiness::FixedDelay`].
pub const DEFAULT_START_DELAY: Duration = Duration::from_secs(1);

/// How activation waits for the remote server to start listening.
///
/// The vendor tool has no readiness handshake. `ConnectProbe` polls the
/// server's address with plain TCP connects and fails activation on timeout;
/// `FixedDelay` sleeps and hopes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Readiness {
    /// Return as soon as the process is spawned.
    None,
    /// Sleep for a fixed time.
    FixedDelay {
        /// Time to sleep.
        #[serde(with = "humantime_serde", default = "default_start_delay")]
        delay: Duration,
    },
    /// Connect to the server until it accepts or `timeout` expires.
    ConnectProbe {
        /// Total time allowed.
        #[serde(with = "humantime_serde", default = "default_ready_timeout")]
        timeout: Duration,
        /// Delay between attempts.
        #[serde(with = "humantime_serde", default = "default_probe_interval")]
        interval: Duration,
    },
}

impl Default for Readiness {
    fn default() -> Self {
        Readiness::ConnectProbe {
            timeout: DEFAULT_READY_TIMEOUT,
            interval: DEFAULT_PROBE_INTERVAL,
        }
    }
}

fn default_start_delay() -> Duration {
    DEFAULT_START_DELAY
}

fn default_ready_timeout() -> Duration {
    DEFAULT_READY_TIMEOUT
}

fn default_probe_interval() -> Duration {
    DEFAULT_PROBE_INTERVAL
}

/// Configuration for [`crate::JLinkDriver`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JLinkDriverConfig {
    /// Explicit tool path. Takes precedence over the `[tools]` registry.
    #[serde(default)]
    pub tool: Option<String>,

    /// Readiness strategy used during activation.
    #[serde(default)]
    pub readiness: Readiness,

    /// Pipe the server's stdout so it can be scanned for its banner.
    #[serde(default)]
    pub capture_output: bool,
}

impl JLinkDriverConfig {
    /// Set the readiness strategy.
    pub fn with_readiness(mut self, readiness: Readiness) -> Self {
        self.readiness = readiness;
        self
    }

    /// Set an explicit tool path.
    pub fn with_tool(mut self, tool: impl Into<String>) -> Self {
        self.tool = Some(tool.into());
        self
    }

    /// Enable or disable stdout capture.
    pub fn with_capture_output(mut self, enabled: bool) -> Self {
        self.capture_output = enabled;
        self
    }
}
