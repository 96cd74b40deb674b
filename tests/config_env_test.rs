//! Configuration loading from files and environment variables.

use figment::Jail;
use probe_server::app::build_driver;
use probe_server::config::AppConfig;
use probe_server::{ProbeKind, Readiness};
use std::time::Duration;

#[test]
fn test_load_from_file() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "probe-server.toml",
            r#"
            [probe]
            serial = "000000123456"

            [server.readiness]
            mode = "none"
            "#,
        )?;

        let config = AppConfig::load_from("probe-server.toml")?;
        assert_eq!(config.probe.serial, "000000123456");
        assert_eq!(config.probe.kind, ProbeKind::Usb);
        assert_eq!(config.server.readiness, Readiness::None);
        assert!(config.validate().is_ok());
        Ok(())
    });
}

#[test]
fn test_environment_overrides_file() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "probe-server.toml",
            r#"
            [application]
            log_level = "info"

            [probe]
            serial = "000000123456"
            "#,
        )?;
        jail.set_env("PROBE_SERVER_APPLICATION__LOG_LEVEL", "debug");
        jail.set_env("PROBE_SERVER_PROBE__SERIAL", "000000654321");
        jail.set_env("PROBE_SERVER_SERVER__READINESS__MODE", "fixed_delay");
        jail.set_env("PROBE_SERVER_SERVER__READINESS__DELAY", "3s");

        let config = AppConfig::load_from("probe-server.toml")?;
        assert_eq!(config.application.log_level, "debug");
        assert_eq!(config.probe.serial, "000000654321");
        assert_eq!(
            config.server.readiness,
            Readiness::FixedDelay {
                delay: Duration::from_secs(3)
            }
        );
        Ok(())
    });
}

#[test]
fn test_environment_only() {
    Jail::expect_with(|jail| {
        jail.set_env("PROBE_SERVER_PROBE__SERIAL", "000000123456");
        jail.set_env("PROBE_SERVER_PROBE__HOST", "exporter.lab");
        jail.set_env("PROBE_SERVER_PROBE__KIND", "network");

        let config = AppConfig::load_from("missing.toml")?;
        assert_eq!(config.probe.host, "exporter.lab");
        assert_eq!(config.probe.kind, ProbeKind::Network);
        assert!(config.tools.is_none());
        Ok(())
    });
}

#[test]
fn test_numeric_serial_keeps_leading_zeros() {
    Jail::expect_with(|jail| {
        jail.set_env("PROBE_SERVER_PROBE__SERIAL", "000000123456");
        jail.set_env("PROBE_SERVER_PROBE__HOST", "10");

        let config = AppConfig::load_from("missing.toml")?;
        assert_eq!(config.probe.serial, "000000123456");
        assert_eq!(config.probe.host, "10");
        assert!(config.validate().is_ok());
        Ok(())
    });
}

#[test]
fn test_tool_path_from_environment() {
    Jail::expect_with(|jail| {
        jail.set_env("PROBE_SERVER_PROBE__SERIAL", "000000123456");
        jail.set_env("PROBE_SERVER_SERVER__TOOL", "/srv/bin/JLinkRemoteServer");

        let config = AppConfig::load_from("missing.toml")?;
        assert_eq!(
            config.server.tool.as_deref(),
            Some("/srv/bin/JLinkRemoteServer")
        );
        assert_eq!(build_driver(&config).tool(), "/srv/bin/JLinkRemoteServer");
        Ok(())
    });
}

#[test]
fn test_tool_registry_from_environment() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "probe-server.toml",
            r#"
            [probe]
            serial = "000000123456"

            [tools]
            openocd = "/usr/bin/openocd"
            "#,
        )?;
        jail.set_env("PROBE_SERVER_TOOLS__JLinkRemoteServer", "/srv/JLinkRemoteServer");

        let config = AppConfig::load_from("probe-server.toml")?;
        assert_eq!(build_driver(&config).tool(), "/srv/JLinkRemoteServer");
        Ok(())
    });
}

#[test]
fn test_shipped_config_is_valid() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config/probe-server.toml");
    let config = AppConfig::figment(path)
        .extract::<AppConfig>()
        .unwrap();
    assert!(config.validate().is_ok());
    assert!(config.tools.is_some());
}
