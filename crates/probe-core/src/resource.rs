//! Bound probe resources.
//!
//! A driver does not discover hardware itself; it is handed a
//! [`ProbeBinding`] describing the probe it should expose. USB probes are
//! usually matched by udev properties, for example:
//!
//! ```text
//! ID_SERIAL_SHORT=000000123456
//! ```
//!
//! [`UdevMatch`] expresses such a rule and [`ProbeBinding::from_udev`] turns a
//! matching property set into a binding.

use crate::error::{ProbeError, ProbeResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Host used for locally attached probes.
pub const LOCAL_HOST: &str = "localhost";

/// udev property holding the short USB serial.
pub const UDEV_SERIAL_SHORT: &str = "ID_SERIAL_SHORT";

/// udev property holding the long USB serial.
pub const UDEV_SERIAL: &str = "ID_SERIAL";

/// How the probe is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeKind {
    /// Attached to this host over USB.
    #[default]
    Usb,
    /// Attached to another host which exports it.
    Network,
}

/// Address clients should use instead of the probe's own host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyEndpoint {
    /// Proxy or tunnel host.
    pub host: String,
    /// Proxy port; the locally allocated port is used when absent.
    #[serde(default)]
    pub port: Option<u16>,
}

/// The probe resource a driver is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeBinding {
    /// Attachment kind.
    #[serde(default)]
    pub kind: ProbeKind,
    /// Opaque device serial, passed to the vendor tool verbatim.
    pub serial: String,
    /// Host the probe is attached to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Optional proxy endpoint.
    #[serde(default)]
    pub proxy: Option<ProxyEndpoint>,
}

fn default_host() -> String {
    LOCAL_HOST.to_string()
}

impl ProbeBinding {
    /// A USB probe attached to this host.
    pub fn usb(serial: impl Into<String>) -> Self {
        Self {
            kind: ProbeKind::Usb,
            serial: serial.into(),
            host: default_host(),
            proxy: None,
        }
    }

    /// A probe exported by `host`.
    pub fn network(host: impl Into<String>, serial: impl Into<String>) -> Self {
        Self {
            kind: ProbeKind::Network,
            serial: serial.into(),
            host: host.into(),
            proxy: None,
        }
    }

    /// Route clients through `proxy`.
    pub fn with_proxy(mut self, proxy: ProxyEndpoint) -> Self {
        self.proxy = Some(proxy);
        self
    }

    /// Build a USB binding from udev properties.
    ///
    /// The serial is taken from `ID_SERIAL_SHORT`, falling back to
    /// `ID_SERIAL`.
    pub fn from_udev(properties: &BTreeMap<String, String>) -> ProbeResult<Self> {
        let serial = properties
            .get(UDEV_SERIAL_SHORT)
            .or_else(|| properties.get(UDEV_SERIAL))
            .ok_or_else(|| {
                ProbeError::Configuration(format!(
                    "udev device has neither {} nor {}",
                    UDEV_SERIAL_SHORT, UDEV_SERIAL
                ))
            })?;
        let binding = Self::usb(serial.clone());
        binding.validate()?;
        Ok(binding)
    }

    /// Check the binding is usable.
    pub fn validate(&self) -> ProbeResult<()> {
        if self.serial.trim().is_empty() {
            return Err(ProbeError::Configuration(
                "probe serial must not be empty".into(),
            ));
        }
        if self.host.trim().is_empty() {
            return Err(ProbeError::Configuration(
                "probe host must not be empty".into(),
            ));
        }
        if let Some(proxy) = &self.proxy {
            if proxy.host.trim().is_empty() {
                return Err(ProbeError::Configuration(
                    "proxy host must not be empty".into(),
                ));
            }
        }
        Ok(())
    }
}

/// A udev match rule: every listed property must be present with the given
/// value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UdevMatch {
    properties: BTreeMap<String, String>,
}

impl UdevMatch {
    /// Create an empty rule, which matches everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `key` to equal `value`.
    pub fn property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Required properties.
    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    /// Whether `device` satisfies every required property.
    pub fn matches(&self, device: &BTreeMap<String, String>) -> bool {
        self.properties
            .iter()
            .all(|(key, value)| device.get(key) == Some(value))
    }

    /// Return the single binding among `devices` that matches this rule.
    pub fn select<'a, I>(&self, devices: I) -> ProbeResult<ProbeBinding>
    where
        I: IntoIterator<Item = &'a BTreeMap<String, String>>,
    {
        let matches: Vec<_> = devices.into_iter().filter(|d| self.matches(d)).collect();
        match matches.as_slice() {
            [device] => ProbeBinding::from_udev(device),
            [] => Err(ProbeError::Configuration(format!(
                "no device matches {:?}",
                self.properties
            ))),
            _ => Err(ProbeError::Configuration(format!(
                "{} devices match {:?}",
                matches.len(),
                self.properties
            ))),
        }
    }
}
