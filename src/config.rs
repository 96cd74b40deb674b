//! Configuration System using Figment
//!
//! Configuration is loaded from:
//! 1. `config/probe-server.toml` (base configuration)
//! 2. Environment variables prefixed with `PROBE_SERVER_`, nested keys
//!    separated by `__`
//!
//! # Example
//! ```no_run
//! use probe_server::config::AppConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::load()?;
//! println!("Serving probe {}", config.probe.serial);
//! # Ok(())
//! # }
//! ```
//!
//! ```toml
//! [application]
//! name = "Probe Server"
//! log_level = "info"
//!
//! [probe]
//! serial = "000000123456"
//!
//! [server.readiness]
//! mode = "connect_probe"
//! timeout = "5s"
//!
//! [tools]
//! JLinkRemoteServer = "/opt/SEGGER/JLink/JLinkRemoteServer"
//! ```

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use probe_core::{ProbeBinding, ToolRegistry};
use probe_driver_jlink::JLinkDriverConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Default configuration file location.
pub const DEFAULT_CONFIG_PATH: &str = "config/probe-server.toml";

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "PROBE_SERVER_";

/// `[probe]` keys taken from the environment as plain strings. Typed parsing
/// would turn a serial such as `000000123456` into the integer `123456`.
const VERBATIM_PROBE_KEYS: [&str; 2] = ["serial", "host"];

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application settings
    #[serde(default)]
    pub application: ApplicationConfig,
    /// Probe to serve
    pub probe: ProbeBinding,
    /// Remote server driver settings
    #[serde(default)]
    pub server: JLinkDriverConfig,
    /// Tool path overrides. `None` when the section is absent, in which case
    /// the vendor's default installation path is used.
    #[serde(default)]
    pub tools: Option<ToolRegistry>,
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Application name
    #[serde(default = "default_name")]
    pub name: String,
    /// Logging level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_name() -> String {
    "Probe Server".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Load configuration from the default file and the environment
    ///
    /// Example: `PROBE_SERVER_APPLICATION__LOG_LEVEL=debug`
    pub fn load() -> Result<Self, figment::Error> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from a specific file path and the environment
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, figment::Error> {
        Self::figment(path).extract()
    }

    /// Provider stack used by [`AppConfig::load_from`].
    pub fn figment<P: AsRef<Path>>(path: P) -> Figment {
        let env = Env::prefixed(ENV_PREFIX)
            .split("__")
            .filter(|key| !is_verbatim_probe_key(key.as_str()));

        Figment::new()
            .merge(Toml::file(path.as_ref()))
            .merge(env)
            .merge(Serialized::defaults(verbatim_probe_env()))
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), String> {
        crate::logging::parse_log_level(&self.application.log_level)?;

        self.probe.validate().map_err(|e| e.to_string())?;

        if let Some(tool) = &self.server.tool {
            if tool.trim().is_empty() {
                return Err("server.tool must not be empty when set".to_string());
            }
        }

        Ok(())
    }
}

fn is_verbatim_probe_key(key: &str) -> bool {
    key.split_once('.').map_or(false, |(section, field)| {
        section.eq_ignore_ascii_case("probe")
            && VERBATIM_PROBE_KEYS
                .iter()
                .any(|verbatim| field.eq_ignore_ascii_case(verbatim))
    })
}

fn probe_env_var(field: &str) -> String {
    format!("{}PROBE__{}", ENV_PREFIX, field.to_uppercase())
}

/// `{"probe": {...}}` holding the verbatim keys that are set.
fn verbatim_probe_env() -> BTreeMap<&'static str, BTreeMap<&'static str, String>> {
    let probe: BTreeMap<_, _> = VERBATIM_PROBE_KEYS
        .iter()
        .filter_map(|field| {
            std::env::var(probe_env_var(field))
                .ok()
                .map(|value| (*field, value))
        })
        .collect();

    let mut root = BTreeMap::new();
    if !probe.is_empty() {
        root.insert("probe", probe);
    }
    root
}
