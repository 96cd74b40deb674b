//! Application glue between configuration and the driver.
//!
//! [`build_driver`] turns an [`AppConfig`] into a ready-to-activate
//! [`JLinkDriver`]; [`serve_until`] runs one activation cycle around a
//! shutdown future.

use crate::config::AppConfig;
use anyhow::{Context, Result};
use probe_core::tools::ToolLookup;
use probe_driver_jlink::JLinkDriver;
use serde::Serialize;
use std::future::Future;

/// What a serving cycle exposed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServeReport {
    /// Probe serial.
    pub serial: String,
    /// Client address as `"<ipv4>:<port>"`.
    pub address: String,
    /// Local port the server listened on.
    pub local_port: u16,
}

/// Build the driver described by `config`.
pub fn build_driver(config: &AppConfig) -> JLinkDriver {
    let tools = config.tools.as_ref().map(|t| t as &dyn ToolLookup);
    JLinkDriver::new(config.probe.clone(), tools, config.server.clone())
}

/// Activate `driver`, report its address through `on_ready`, wait for
/// `shutdown` and deactivate.
///
/// Deactivation also runs when `on_ready` fails.
pub async fn serve_until<F, R>(
    driver: &mut JLinkDriver,
    shutdown: F,
    on_ready: R,
) -> Result<ServeReport>
where
    F: Future<Output = ()>,
    R: FnOnce(&ServeReport) -> Result<()>,
{
    driver
        .activate()
        .await
        .with_context(|| format!("Failed to start server for probe {}", driver.binding().serial))?;

    let report = match describe(driver).await {
        Ok(report) => report,
        Err(e) => {
            if let Err(stop_err) = driver.deactivate().await {
                tracing::warn!(error = %stop_err, "Failed to stop remote server");
            }
            return Err(e);
        }
    };

    let ready = on_ready(&report);
    if ready.is_ok() {
        shutdown.await;
    }

    driver
        .deactivate()
        .await
        .context("Failed to stop remote server")?;
    ready.map(|()| report)
}

async fn describe(driver: &JLinkDriver) -> Result<ServeReport> {
    let address = driver.address().await.context("Failed to resolve server address")?;
    let serial = driver.serial()?.to_string();
    let local_port = driver
        .session()
        .map(|s| s.allocated_port())
        .context("Driver has no session")?;
    Ok(ServeReport {
        serial,
        address,
        local_port,
    })
}
