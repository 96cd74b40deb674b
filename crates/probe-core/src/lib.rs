//! `probe-core`
//!
//! Core types and traits shared by probe-server drivers.
//!
//! A probe driver exposes a hardware debug probe through a vendor helper
//! process. This crate holds everything such a driver consumes but does not
//! own itself:
//!
//! - [`error`]: the [`ProbeError`] type and [`ProbeResult`] alias
//! - [`lifecycle`]: activation state, guard and injectable hooks
//! - [`resource`]: the bound probe ([`ProbeBinding`]) and udev matching
//! - [`tools`]: tool path lookup from configuration
//! - [`net`]: free-port allocation, proxy resolution, IPv4 name resolution

pub mod error;
pub mod lifecycle;
pub mod net;
pub mod resource;
pub mod tools;

pub use error::{ProbeError, ProbeResult};
pub use lifecycle::{Activatable, ActivationGuard, ActivationState, LifecycleHooks, NoopHooks};
pub use net::{DirectResolver, EphemeralPortAllocator, PortAllocator, ProxyResolver};
pub use resource::{ProbeBinding, ProbeKind, ProxyEndpoint, UdevMatch};
pub use tools::{ToolLookup, ToolRegistry};
