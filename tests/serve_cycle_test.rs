//! End-to-end serving cycle against a fake remote server script.

#![cfg(unix)]

use figment::providers::{Format, Toml};
use figment::Figment;
use probe_server::app::{build_driver, serve_until};
use probe_server::config::AppConfig;
use probe_server::ProbeError;
use std::os::unix::fs::PermissionsExt;

fn fake_tool(dir: &tempfile::TempDir) -> String {
    let path = dir.path().join("JLinkRemoteServer");
    std::fs::write(&path, "#!/bin/sh\nexec sleep 30\n").unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path.to_string_lossy().into_owned()
}

fn config(tool: &str) -> AppConfig {
    config_for_host(tool, "127.0.0.1")
}

fn config_for_host(tool: &str, host: &str) -> AppConfig {
    Figment::new()
        .merge(Toml::string(&format!(
            r#"
            [probe]
            kind = "network"
            serial = "000000123456"
            host = "{}"

            [server.readiness]
            mode = "none"

            [tools]
            JLinkRemoteServer = "{}"
            "#,
            host, tool
        )))
        .extract()
        .unwrap()
}

#[tokio::test]
async fn test_serve_cycle_reports_address() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(&fake_tool(&dir));
    let mut driver = build_driver(&config);

    let mut seen = None;
    let report = serve_until(&mut driver, async {}, |report| {
        seen = Some(report.clone());
        Ok(())
    })
    .await
    .unwrap();

    assert_eq!(seen.as_ref(), Some(&report));
    assert_eq!(report.serial, "000000123456");
    assert_eq!(report.address, format!("127.0.0.1:{}", report.local_port));
    assert!(driver.session().is_none());
}

#[tokio::test]
async fn test_serve_cycle_deactivates_when_reporting_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(&fake_tool(&dir));
    let mut driver = build_driver(&config);

    let result = serve_until(&mut driver, async {}, |_| anyhow::bail!("stdout closed")).await;
    assert!(result.is_err());
    assert!(driver.session().is_none());
    assert!(matches!(driver.serial(), Err(ProbeError::NotActive { .. })));
}

#[tokio::test]
async fn test_serve_cycle_stops_server_when_address_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for_host(&fake_tool(&dir), "exporter.invalid");
    let mut driver = build_driver(&config);

    let mut reported = false;
    let result = serve_until(&mut driver, async {}, |_| {
        reported = true;
        Ok(())
    })
    .await;

    let err = result.unwrap_err();
    assert!(format!("{:#}", err).contains("exporter.invalid"), "{err:#}");
    assert!(!reported);
    assert!(driver.session().is_none());
}
