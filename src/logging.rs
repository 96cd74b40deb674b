//! Log output of the `probe-server` binary.
//!
//! The level comes from `application.log_level`. Directives in `RUST_LOG`
//! are added on top, so `RUST_LOG=probe_driver_jlink=trace` narrows in on
//! the driver without touching the file. The layout is picked with
//! `--log-format`.

use clap::ValueEnum;
use tracing::Level;
use tracing_subscriber::{filter::LevelFilter, fmt, EnvFilter};

/// Layout of log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Multi-line, coloured output for a terminal.
    #[default]
    Pretty,
    /// One line per event, no colours.
    Compact,
    /// Newline-delimited JSON for log collectors.
    Json,
}

/// Install the global subscriber.
///
/// Fails if a subscriber is already installed.
pub fn init(level: Level, format: OutputFormat) -> Result<(), String> {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy();
    let builder = fmt().with_env_filter(filter);

    let result = match format {
        OutputFormat::Pretty => builder.pretty().try_init(),
        OutputFormat::Compact => builder.compact().with_ansi(false).try_init(),
        OutputFormat::Json => builder.json().try_init(),
    };
    result.map_err(|e| format!("Failed to initialize logging: {}", e))
}

/// Parse a configured level name, ignoring case.
pub fn parse_log_level(level: &str) -> Result<Level, String> {
    level.trim().parse::<Level>().map_err(|_| {
        format!(
            "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
            level
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_log_level() {
        assert_eq!(parse_log_level("debug"), Ok(Level::DEBUG));
        assert_eq!(parse_log_level("WARN"), Ok(Level::WARN));
        assert_eq!(parse_log_level(" error "), Ok(Level::ERROR));
        assert!(parse_log_level("verbose").is_err());
        assert!(parse_log_level("").is_err());
    }

    #[test]
    fn test_format_names() {
        assert_eq!(OutputFormat::from_str("json", true), Ok(OutputFormat::Json));
        assert_eq!(
            OutputFormat::from_str("Compact", true),
            Ok(OutputFormat::Compact)
        );
        assert!(OutputFormat::from_str("xml", true).is_err());
    }
}
