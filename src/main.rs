//! CLI Entry Point for probe-server
//!
//! # Usage
//!
//! Serve the configured probe until Ctrl+C:
//! ```bash
//! probe-server serve --config config/probe-server.toml
//! ```
//!
//! Serve a probe given on the command line:
//! ```bash
//! probe-server serve --serial 000000123456
//! ```
//!
//! Show which remote server binary would be used:
//! ```bash
//! probe-server tool
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use probe_server::app::{build_driver, serve_until};
use probe_server::config::{AppConfig, DEFAULT_CONFIG_PATH};
use probe_server::logging::{self, OutputFormat};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "probe-server")]
#[command(about = "Expose a debug probe through its vendor remote server", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value = "pretty")]
    log_format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the remote server and keep it running until Ctrl+C
    Serve {
        /// Probe serial, overriding the configuration
        #[arg(long)]
        serial: Option<String>,

        /// Probe host, overriding the configuration
        #[arg(long)]
        host: Option<String>,

        /// Print the address as JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Print the resolved remote server binary
    Tool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load_from(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;

    if let Commands::Serve { serial, host, .. } = &cli.command {
        if let Some(serial) = serial {
            config.probe.serial = serial.clone();
        }
        if let Some(host) = host {
            config.probe.host = host.clone();
        }
    }

    config.validate().map_err(anyhow::Error::msg)?;

    let level = logging::parse_log_level(&config.application.log_level).map_err(anyhow::Error::msg)?;
    logging::init(level, cli.log_format).map_err(anyhow::Error::msg)?;

    match cli.command {
        Commands::Serve { json, .. } => serve(&config, json).await,
        Commands::Tool => {
            println!("{}", build_driver(&config).tool());
            Ok(())
        }
    }
}

async fn serve(config: &AppConfig, json: bool) -> Result<()> {
    let mut driver = build_driver(config);
    tracing::info!(
        application = %config.application.name,
        serial = %config.probe.serial,
        tool = %driver.tool(),
        "Starting probe server"
    );

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        }
    };

    let report = serve_until(&mut driver, shutdown, |report| {
        if json {
            println!("{}", serde_json::to_string(report)?);
        } else {
            println!("{} {}", report.serial, report.address);
        }
        Ok(())
    })
    .await?;

    tracing::info!(serial = %report.serial, "Probe server stopped");
    Ok(())
}
