//! SEGGER J-Link Remote Server Driver
//!
//! This crate provides a driver that makes a J-Link debug probe reachable
//! over the network by running SEGGER's `JLinkRemoteServer` for it.
//!
//! # Communication
//!
//! The driver never talks to the probe. It launches
//! `JLinkRemoteServer -Port <port> -select USB=<serial>` and reports the
//! server's `"<ipv4>:<port>"` address, which J-Link client libraries accept
//! as a remote host.
//!
//! # Usage
//!
//! ```rust,ignore
//! use probe_core::ProbeBinding;
//! use probe_driver_jlink::{JLinkDriver, JLinkDriverConfig};
//!
//! let mut driver = JLinkDriver::new(
//!     ProbeBinding::usb("000000123456"),
//!     None,
//!     JLinkDriverConfig::default(),
//! );
//! driver.activate().await?;
//! println!("{}", driver.address().await?);
//! ```
//!
//! # Readiness
//!
//! The server gives no signal when it starts listening. By default
//! activation polls the address with TCP connects (see [`Readiness`]).

mod config;
mod driver;
mod server;

pub use config::{
    JLinkDriverConfig, Readiness, DEFAULT_PROBE_INTERVAL, DEFAULT_READY_TIMEOUT,
    DEFAULT_START_DELAY,
};
pub use driver::{JLinkDriver, ServerSession, DEFAULT_TOOL_PATH, DRIVER_NAME, TOOL_NAME};
pub use server::{wait_for_listener, RemoteServerCommand, ServerProcess, READY_BANNER};
