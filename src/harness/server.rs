//! Local dropbear server lifecycle
//!
//! The server runs in the foreground (`-F`) with logging on stderr (`-E`).
//! It is considered ready once a stderr line contains the configured marker.

use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, BufReader, Split};
use tokio::process::{Child, ChildStderr, Command};
use tokio::time::{timeout, Duration};

use crate::common::config::ServerSettings;
use crate::common::{split_program, Error, Result};
use crate::options::RunConfig;

/// Grace period after SIGTERM before the server is killed
const STOP_TIMEOUT_SECS: u64 = 5;

/// A running local dropbear
pub struct DropbearServer {
    child: Child,
    addr: String,
}

impl DropbearServer {
    /// Start a local server unless the run targets a remote host
    ///
    /// Returns `Ok(None)` for remote runs.
    pub async fn start(config: &RunConfig, settings: &ServerSettings) -> Result<Option<Self>> {
        if config.is_remote() {
            tracing::info!(remote = ?config.remote, "Using remote server");
            return Ok(None);
        }
        Self::launch(config, settings).await.map(Some)
    }

    async fn launch(config: &RunConfig, settings: &ServerSettings) -> Result<Self> {
        let argv = server_argv(config, settings)?;
        tracing::debug!(?argv, "Spawning dropbear");

        let mut child = Command::new(&argv[0])
            .args(&argv[1..])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::ServerSpawnFailed(format!("{}: {}", argv[0], e)))?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| Error::ServerSpawnFailed("stderr not captured".to_string()))?;
        let mut lines = BufReader::new(stderr).split(b'\n');

        let wait = Duration::from_secs(settings.startup_timeout_secs);
        match timeout(wait, wait_for_marker(&mut lines, &settings.ready_marker)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                let _ = child.kill().await;
                return Err(e);
            }
            Err(_) => {
                let _ = child.kill().await;
                return Err(Error::ServerStartTimeout(settings.startup_timeout_secs));
            }
        }

        if let Some(status) = child.try_wait()? {
            return Err(Error::ServerExited(format!("exited with {status} after ready")));
        }

        tokio::spawn(drain_stderr(lines));

        let addr = format!("{}:{}", settings.listen_addr, config.port);
        tracing::info!(%addr, pid = ?child.id(), "dropbear ready");
        Ok(Self { child, addr })
    }

    /// Address the server listens on
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Process id, if the server is still running
    pub fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    /// Terminate the server and wait for it to exit
    pub async fn stop(mut self) -> Result<()> {
        tracing::debug!(addr = %self.addr, "Stopping dropbear");
        terminate(&mut self.child)?;

        match timeout(Duration::from_secs(STOP_TIMEOUT_SECS), self.child.wait()).await {
            Ok(status) => {
                let status = status?;
                tracing::debug!(%status, "dropbear exited");
            }
            Err(_) => {
                tracing::warn!("dropbear ignored SIGTERM, killing");
                self.child.kill().await?;
            }
        }
        Ok(())
    }
}

/// Build the server command line
pub fn server_argv(config: &RunConfig, settings: &ServerSettings) -> Result<Vec<String>> {
    let mut argv = split_program(&config.dropbear);
    if argv.is_empty() {
        return Err(Error::Config("--dropbear is empty".to_string()));
    }
    let hostkey = config.hostkey.as_ref().ok_or(Error::MissingHostKey)?;

    argv.extend([
        "-p".to_string(),
        format!("{}:{}", settings.listen_addr, config.port),
        "-r".to_string(),
        hostkey.display().to_string(),
        "-F".to_string(),
        "-E".to_string(),
    ]);
    Ok(argv)
}

/// Raw stderr lines; dropbear may log bytes that are not UTF-8
type StderrLines = Split<BufReader<ChildStderr>>;

async fn next_line(lines: &mut StderrLines) -> std::io::Result<Option<String>> {
    let segment = lines.next_segment().await?;
    Ok(segment.map(|bytes| {
        String::from_utf8_lossy(&bytes)
            .trim_end_matches('\r')
            .to_string()
    }))
}

async fn wait_for_marker(lines: &mut StderrLines, marker: &str) -> Result<()> {
    let mut last = String::new();
    while let Some(line) = next_line(lines).await? {
        tracing::debug!(target: "dbtest::dropbear", "{line}");
        if line.contains(marker) {
            return Ok(());
        }
        last = line;
    }
    Err(Error::ServerExited(if last.is_empty() {
        "no output".to_string()
    } else {
        last
    }))
}

async fn drain_stderr(mut lines: StderrLines) {
    loop {
        match next_line(&mut lines).await {
            Ok(Some(line)) => tracing::debug!(target: "dbtest::dropbear", "{line}"),
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(error = %e, "Lost dropbear stderr");
                break;
            }
        }
    }
}

#[cfg(unix)]
fn terminate(child: &mut Child) -> Result<()> {
    if let Some(pid) = child.id() {
        // SIGTERM lets dropbear clean up its listening socket
        let result = unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
        if result != 0 {
            return Err(std::io::Error::last_os_error().into());
        }
    }
    Ok(())
}

#[cfg(not(unix))]
fn terminate(child: &mut Child) -> Result<()> {
    child.start_kill()?;
    Ok(())
}
