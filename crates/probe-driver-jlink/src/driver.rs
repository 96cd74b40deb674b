//! J-Link Remote Server Driver
//!
//! Exposes a USB-attached J-Link over TCP by running SEGGER's
//! `JLinkRemoteServer` for the bound probe. Each activation allocates a
//! fresh local port, starts one server process and resolves the address
//! clients should use. Deactivation kills the process.
//!
//! # Example
//!
//! ```rust,ignore
//! use probe_core::{ProbeBinding, ToolRegistry};
//! use probe_driver_jlink::{JLinkDriver, JLinkDriverConfig};
//!
//! let tools = ToolRegistry::new();
//! let mut driver = JLinkDriver::new(
//!     ProbeBinding::usb("000000123456"),
//!     Some(&tools),
//!     JLinkDriverConfig::default(),
//! );
//!
//! driver.activate().await?;
//! let address = driver.address().await?; // "127.0.0.1:40123"
//! // hand `address` to a J-Link client library
//! driver.deactivate().await?;
//! ```

use crate::config::{JLinkDriverConfig, Readiness};
use crate::server::{wait_for_listener, RemoteServerCommand, ServerProcess};
use async_trait::async_trait;
use probe_core::lifecycle::{Activatable, ActivationGuard, ActivationState, LifecycleHooks};
use probe_core::net::{format_address, resolve_ipv4};
use probe_core::tools::{resolve_tool, ToolLookup};
use probe_core::{
    DirectResolver, EphemeralPortAllocator, NoopHooks, PortAllocator, ProbeBinding, ProbeResult,
    ProxyResolver,
};
use std::sync::Arc;

/// Name used for this driver in logs and errors.
pub const DRIVER_NAME: &str = "jlink";

/// Tool name looked up in the `[tools]` registry.
pub const TOOL_NAME: &str = "JLinkRemoteServer";

/// Location of the most recently installed J-Link software on Linux.
///
/// See <https://wiki.segger.com/Generic_IDE#Linux>.
pub const DEFAULT_TOOL_PATH: &str = "/opt/SEGGER/JLink/JLinkRemoteServer";

/// Runtime state of one activation.
#[derive(Debug)]
pub struct ServerSession {
    process: ServerProcess,
    allocated_port: u16,
    resolved_host: String,
    resolved_port: u16,
}

impl ServerSession {
    /// Local port the server was told to listen on.
    pub fn allocated_port(&self) -> u16 {
        self.allocated_port
    }

    /// Host clients should connect to, after proxy resolution.
    pub fn resolved_host(&self) -> &str {
        &self.resolved_host
    }

    /// Port clients should connect to, after proxy resolution.
    pub fn resolved_port(&self) -> u16 {
        self.resolved_port
    }

    /// Server process id.
    pub fn pid(&self) -> Option<u32> {
        self.process.pid()
    }

    /// The server process.
    pub fn process_mut(&mut self) -> &mut ServerProcess {
        &mut self.process
    }
}

/// Driver for a J-Link served through `JLinkRemoteServer`.
///
/// A session exists exactly while the driver is active. The driver is
/// single-owner: every operation takes `&mut self` and runs to completion
/// before returning.
pub struct JLinkDriver {
    binding: ProbeBinding,
    tool: String,
    config: JLinkDriverConfig,
    guard: ActivationGuard,
    ports: Arc<dyn PortAllocator>,
    proxy: Arc<dyn ProxyResolver>,
    hooks: Arc<dyn LifecycleHooks>,
    session: Option<ServerSession>,
}

impl std::fmt::Debug for JLinkDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JLinkDriver")
            .field("binding", &self.binding)
            .field("tool", &self.tool)
            .field("state", &self.guard.state())
            .field("session", &self.session)
            .finish()
    }
}

impl JLinkDriver {
    /// Create an inactive driver for `binding`.
    ///
    /// The tool path is resolved once, here: an explicit `config.tool`
    /// wins, then a `JLinkRemoteServer` entry in `tools`. With a registry
    /// but no entry the bare tool name is used; without a registry the
    /// default installation path. The path is not checked; a bad one fails
    /// at activation.
    pub fn new(
        binding: ProbeBinding,
        tools: Option<&dyn ToolLookup>,
        config: JLinkDriverConfig,
    ) -> Self {
        let tool = match &config.tool {
            Some(tool) => tool.clone(),
            None => resolve_tool(tools, TOOL_NAME, DEFAULT_TOOL_PATH),
        };
        tracing::debug!(serial = %binding.serial, %tool, "Created J-Link driver");

        Self {
            binding,
            tool,
            config,
            guard: ActivationGuard::new(DRIVER_NAME),
            ports: Arc::new(EphemeralPortAllocator),
            proxy: Arc::new(DirectResolver),
            hooks: Arc::new(NoopHooks),
            session: None,
        }
    }

    /// Replace the free-port allocator.
    pub fn with_port_allocator(mut self, ports: Arc<dyn PortAllocator>) -> Self {
        self.ports = ports;
        self
    }

    /// Replace the proxy resolver.
    pub fn with_proxy_resolver(mut self, proxy: Arc<dyn ProxyResolver>) -> Self {
        self.proxy = proxy;
        self
    }

    /// Replace the lifecycle hooks.
    pub fn with_hooks(mut self, hooks: Arc<dyn LifecycleHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Resolved tool path.
    pub fn tool(&self) -> &str {
        &self.tool
    }

    /// Bound probe.
    pub fn binding(&self) -> &ProbeBinding {
        &self.binding
    }

    /// Driver configuration.
    pub fn config(&self) -> &JLinkDriverConfig {
        &self.config
    }

    /// Activation state.
    pub fn state(&self) -> ActivationState {
        self.guard.state()
    }

    /// Current session, present exactly while active.
    pub fn session(&self) -> Option<&ServerSession> {
        self.session.as_ref()
    }

    /// Mutable access to the current session.
    pub fn session_mut(&mut self) -> Option<&mut ServerSession> {
        self.session.as_mut()
    }

    /// Start the remote server for the bound probe.
    #[tracing::instrument(skip(self), fields(serial = %self.binding.serial))]
    pub async fn activate(&mut self) -> ProbeResult<()> {
        self.guard.check_inactive()?;

        let mut session = self.start_session().await?;

        if let Err(e) = self.hooks.on_activate(DRIVER_NAME).await {
            tracing::warn!(error = %e, "Activation hook failed, stopping remote server");
            if let Err(kill_err) = session.process.kill().await {
                tracing::warn!(error = %kill_err, "Failed to stop remote server");
            }
            return Err(e);
        }

        tracing::info!(
            port = session.allocated_port,
            host = %session.resolved_host,
            resolved_port = session.resolved_port,
            "J-Link remote server active"
        );
        self.session = Some(session);
        self.guard.mark_active();
        Ok(())
    }

    async fn start_session(&self) -> ProbeResult<ServerSession> {
        let port = self.ports.allocate()?;
        let command = RemoteServerCommand::new(self.tool.as_str(), port, self.binding.serial.as_str());
        tracing::info!(%command, "Starting J-Link remote server");

        let mut process = ServerProcess::spawn(&command, self.config.capture_output)?;

        match self.connect_session(&mut process, port).await {
            Ok((resolved_host, resolved_port)) => Ok(ServerSession {
                process,
                allocated_port: port,
                resolved_host,
                resolved_port,
            }),
            Err(e) => {
                if let Err(kill_err) = process.kill().await {
                    tracing::warn!(error = %kill_err, "Failed to stop remote server");
                }
                Err(e)
            }
        }
    }

    async fn connect_session(
        &self,
        process: &mut ServerProcess,
        port: u16,
    ) -> ProbeResult<(String, u16)> {
        let (host, resolved_port) = self.proxy.host_and_port(&self.binding, port)?;

        match &self.config.readiness {
            Readiness::None => {}
            Readiness::FixedDelay { delay } => {
                tracing::debug!(?delay, "Waiting for remote server to start");
                tokio::time::sleep(*delay).await;
            }
            Readiness::ConnectProbe { timeout, interval } => {
                tracing::debug!(%host, port = resolved_port, ?timeout, "Probing remote server");
                wait_for_listener(process, &host, resolved_port, *timeout, *interval).await?;
            }
        }

        Ok((host, resolved_port))
    }

    /// Kill the remote server.
    ///
    /// The lifecycle hook runs even when killing fails; the kill error is
    /// returned afterwards.
    #[tracing::instrument(skip(self), fields(serial = %self.binding.serial))]
    pub async fn deactivate(&mut self) -> ProbeResult<()> {
        self.guard.check_active()?;

        let kill_result = match self.session.take() {
            Some(mut session) => session.process.kill().await,
            None => Ok(()),
        };
        self.guard.mark_inactive();
        tracing::info!("J-Link remote server stopped");

        self.hooks.on_deactivate(DRIVER_NAME).await?;
        kill_result
    }

    /// Address of the remote server as `"<ipv4>:<port>"`.
    ///
    /// J-Link software only accepts numeric addresses, so the probe host is
    /// resolved here. The result can be passed verbatim to J-Link client
    /// libraries.
    #[tracing::instrument(skip(self))]
    pub async fn address(&self) -> ProbeResult<String> {
        self.guard.check_active()?;
        let port = self
            .session
            .as_ref()
            .map(|s| s.resolved_port)
            .ok_or_else(|| probe_core::ProbeError::NotActive {
                driver: DRIVER_NAME.to_string(),
            })?;

        let ip = resolve_ipv4(&self.binding.host).await?;
        Ok(format_address(ip, port))
    }

    /// Serial of the bound probe.
    pub fn serial(&self) -> ProbeResult<&str> {
        self.guard.check_active()?;
        Ok(&self.binding.serial)
    }

    /// Whether the server process is still running.
    pub fn is_server_running(&mut self) -> bool {
        self.session
            .as_mut()
            .map(|s| s.process.is_running())
            .unwrap_or(false)
    }
}

#[async_trait]
impl Activatable for JLinkDriver {
    async fn activate(&mut self) -> ProbeResult<()> {
        JLinkDriver::activate(self).await
    }

    async fn deactivate(&mut self) -> ProbeResult<()> {
        JLinkDriver::deactivate(self).await
    }

    fn state(&self) -> ActivationState {
        JLinkDriver::state(self)
    }
}
