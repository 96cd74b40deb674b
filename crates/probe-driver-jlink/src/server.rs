//! J-Link Remote Server process handling.
//!
//! The server is started as
//!
//! ```text
//! JLinkRemoteServer -Port <port> -select USB=<serial>
//! ```
//!
//! and bridges the TCP port to the USB probe. See
//! <https://wiki.segger.com/J-Link_Remote_Server>.

use probe_core::{ProbeError, ProbeResult};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;
use tokio::process::{Child, ChildStdout, Command};

/// Line the server prints once it accepts clients.
pub const READY_BANNER: &str = "Waiting for client connections...";

/// Command line of one server instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteServerCommand {
    program: String,
    port: u16,
    serial: String,
}

impl RemoteServerCommand {
    /// Serve the probe with `serial` on `port` using `program`.
    pub fn new(program: impl Into<String>, port: u16, serial: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            port,
            serial: serial.into(),
        }
    }

    /// Tool path or name.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Listen port passed to the tool.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Arguments, without the program.
    pub fn args(&self) -> Vec<String> {
        vec![
            "-Port".to_string(),
            self.port.to_string(),
            "-select".to_string(),
            format!("USB={}", self.serial),
        ]
    }

    /// Full command line, program first.
    pub fn argv(&self) -> Vec<String> {
        let mut argv = vec![self.program.clone()];
        argv.extend(self.args());
        argv
    }
}

impl std::fmt::Display for RemoteServerCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.argv().join(" "))
    }
}

/// A running server process.
///
/// The child is killed when this value is dropped.
#[derive(Debug)]
pub struct ServerProcess {
    tool: String,
    child: Child,
    pid: Option<u32>,
    stdout: Option<BufReader<ChildStdout>>,
}

impl ServerProcess {
    /// Spawn `command`.
    ///
    /// With `capture_output` the server's stdout is piped and can be read
    /// through [`ServerProcess::wait_for_banner`]; otherwise it is inherited.
    pub fn spawn(command: &RemoteServerCommand, capture_output: bool) -> ProbeResult<Self> {
        let mut cmd = Command::new(command.program());
        cmd.args(command.args())
            .stdin(Stdio::null())
            .kill_on_drop(true);
        if capture_output {
            cmd.stdout(Stdio::piped());
        }

        let mut child = cmd.spawn().map_err(|source| ProbeError::Spawn {
            tool: command.program().to_string(),
            source,
        })?;

        let pid = child.id();
        let stdout = child.stdout.take().map(BufReader::new);
        tracing::debug!(?pid, %command, "Spawned remote server");

        Ok(Self {
            tool: command.program().to_string(),
            child,
            pid,
            stdout,
        })
    }

    /// OS process id, cleared once [`ServerProcess::kill`] succeeds.
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Whether the process is still running.
    pub fn is_running(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    /// Fail with [`ProbeError::ServerExited`] if the process is gone.
    pub fn ensure_running(&mut self) -> ProbeResult<()> {
        match self.child.try_wait()? {
            None => Ok(()),
            Some(status) => Err(ProbeError::ServerExited {
                tool: self.tool.clone(),
                status: status.to_string(),
            }),
        }
    }

    /// Kill the process and reap it.
    ///
    /// A process that already exited on its own is only reaped.
    pub async fn kill(&mut self) -> ProbeResult<()> {
        if let Some(status) = self.child.try_wait()? {
            tracing::warn!(pid = ?self.pid, %status, "Remote server already exited");
            self.pid = None;
            return Ok(());
        }
        self.child.kill().await?;
        tracing::debug!(pid = ?self.pid, "Killed remote server");
        self.pid = None;
        Ok(())
    }

    /// Read stdout until [`READY_BANNER`] appears.
    ///
    /// Returns `Ok(false)` when output is not captured, the stream ends, or
    /// `timeout` expires first.
    pub async fn wait_for_banner(&mut self, timeout: Duration) -> ProbeResult<bool> {
        let Some(stdout) = self.stdout.as_mut() else {
            return Ok(false);
        };

        match tokio::time::timeout(timeout, scan_for_banner(stdout)).await {
            Ok(found) => Ok(found?),
            Err(_) => Ok(false),
        }
    }
}

/// Connect to `host:port` until it accepts or `timeout` expires.
///
/// `process` is checked between attempts so a server that dies during
/// startup fails fast instead of running into the timeout.
pub async fn wait_for_listener(
    process: &mut ServerProcess,
    host: &str,
    port: u16,
    timeout: Duration,
    interval: Duration,
) -> ProbeResult<()> {
    let address = format!("{}:{}", host, port);

    match tokio::time::timeout(timeout, poll_listener(process, host, port, interval)).await {
        Ok(result) => result,
        Err(_) => Err(ProbeError::ReadinessTimeout { address, timeout }),
    }
}

async fn scan_for_banner(stdout: &mut BufReader<ChildStdout>) -> std::io::Result<bool> {
    let mut line = String::new();
    loop {
        line.clear();
        if stdout.read_line(&mut line).await? == 0 {
            return Ok(false);
        }
        tracing::trace!(line = line.trim_end(), "Remote server output");
        if line.contains(READY_BANNER) {
            return Ok(true);
        }
    }
}

async fn poll_listener(
    process: &mut ServerProcess,
    host: &str,
    port: u16,
    interval: Duration,
) -> ProbeResult<()> {
    loop {
        match TcpStream::connect((host, port)).await {
            Ok(_) => return Ok(()),
            Err(e) => {
                tracing::trace!(host, port, error = %e, "Remote server not listening yet");
            }
        }
        process.ensure_running()?;
        tokio::time::sleep(interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line() {
        let command = RemoteServerCommand::new("JLinkRemoteServer", 19020, "000000123456");
        assert_eq!(
            command.argv(),
            vec![
                "JLinkRemoteServer",
                "-Port",
                "19020",
                "-select",
                "USB=000000123456"
            ]
        );
        assert_eq!(
            command.to_string(),
            "JLinkRemoteServer -Port 19020 -select USB=000000123456"
        );
    }

    #[tokio::test]
    async fn test_spawn_missing_tool() {
        let command = RemoteServerCommand::new("/nonexistent/JLinkRemoteServer", 19020, "1");
        let err = ServerProcess::spawn(&command, false).unwrap_err();
        match err {
            ProbeError::Spawn { tool, source } => {
                assert_eq!(tool, "/nonexistent/JLinkRemoteServer");
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(unix)]
    mod unix {
        use super::*;
        use std::os::unix::fs::PermissionsExt;
        use std::path::PathBuf;

        fn script(dir: &tempfile::TempDir, body: &str) -> PathBuf {
            let path = dir.path().join("JLinkRemoteServer");
            std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        #[tokio::test]
        async fn test_banner_detected() {
            let dir = tempfile::tempdir().unwrap();
            let tool = script(
                &dir,
                "echo 'SEGGER J-Link Remote Server'\necho 'Waiting for client connections...'\nexec sleep 30",
            );
            let command = RemoteServerCommand::new(tool.to_string_lossy(), 19020, "1");
            let mut process = ServerProcess::spawn(&command, true).unwrap();

            assert!(process.wait_for_banner(Duration::from_secs(5)).await.unwrap());
            assert!(process.is_running());

            process.kill().await.unwrap();
            assert!(!process.is_running());
        }

        #[tokio::test]
        async fn test_banner_not_captured() {
            let dir = tempfile::tempdir().unwrap();
            let tool = script(&dir, "exec sleep 30");
            let command = RemoteServerCommand::new(tool.to_string_lossy(), 19020, "1");
            let mut process = ServerProcess::spawn(&command, false).unwrap();

            assert!(!process.wait_for_banner(Duration::from_millis(50)).await.unwrap());
            process.kill().await.unwrap();
        }

        #[tokio::test]
        async fn test_pid_cleared_by_kill() {
            let dir = tempfile::tempdir().unwrap();
            let tool = script(&dir, "exec sleep 30");
            let command = RemoteServerCommand::new(tool.to_string_lossy(), 19020, "1");
            let mut process = ServerProcess::spawn(&command, false).unwrap();

            assert!(process.pid().is_some());
            process.kill().await.unwrap();
            assert_eq!(process.pid(), None);
        }

        #[tokio::test]
        async fn test_kill_after_exit_is_ok() {
            let dir = tempfile::tempdir().unwrap();
            let tool = script(&dir, "exit 0");
            let command = RemoteServerCommand::new(tool.to_string_lossy(), 19020, "1");
            let mut process = ServerProcess::spawn(&command, false).unwrap();

            for _ in 0..100 {
                if !process.is_running() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
            assert!(process.kill().await.is_ok());
            assert_eq!(process.pid(), None);
        }

        #[tokio::test]
        async fn test_listener_wait_fails_fast_on_exit() {
            let dir = tempfile::tempdir().unwrap();
            let tool = script(&dir, "exit 3");
            let port = std::net::TcpListener::bind("127.0.0.1:0")
                .unwrap()
                .local_addr()
                .unwrap()
                .port();
            let command = RemoteServerCommand::new(tool.to_string_lossy(), port, "1");
            let mut process = ServerProcess::spawn(&command, false).unwrap();

            let err = wait_for_listener(
                &mut process,
                "127.0.0.1",
                port,
                Duration::from_secs(10),
                Duration::from_millis(20),
            )
            .await
            .unwrap_err();
            assert!(matches!(err, ProbeError::ServerExited { .. }), "{err}");
        }
    }
}
