//! dbclient invocations against the configured host

use std::ffi::OsStr;
use std::process::{Output, Stdio};

use tokio::process::{Child, Command};
use tokio::time::{timeout, Duration};

use crate::common::{split_program, Error, Result, Settings};
use crate::options::RunConfig;

/// Builds and runs dbclient command lines
#[derive(Debug, Clone)]
pub struct DbClient {
    base: Vec<String>,
    timeout_secs: u64,
}

impl DbClient {
    /// Prepare a client for the given run
    ///
    /// Dials `--remote` when set, otherwise the local listen address.
    /// `-y` accepts the host key without prompting.
    pub fn new(config: &RunConfig, settings: &Settings) -> Result<Self> {
        let mut base = split_program(&config.dbclient);
        if base.is_empty() {
            return Err(Error::Config("--dbclient is empty".to_string()));
        }

        let host = config
            .remote
            .clone()
            .unwrap_or_else(|| settings.server.listen_addr.clone());
        base.extend(["-y".to_string(), host, "-p".to_string(), config.port.clone()]);
        if let Some(user) = &config.user {
            base.extend(["-l".to_string(), user.clone()]);
        }

        Ok(Self {
            base,
            timeout_secs: settings.client.timeout_secs,
        })
    }

    /// Base argv, without caller arguments
    pub fn base_args(&self) -> &[String] {
        &self.base
    }

    /// Full argv for a call with extra arguments
    pub fn argv<I, S>(&self, args: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.base
            .iter()
            .cloned()
            .chain(args.into_iter().map(|a| a.as_ref().to_string()))
            .collect()
    }

    /// Override the foreground timeout
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    fn command<I, S>(&self, args: I) -> Command
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let argv = self.argv(args);
        tracing::debug!(?argv, "dbclient");
        let mut cmd = Command::new(OsStr::new(&argv[0]));
        cmd.args(&argv[1..]).kill_on_drop(true);
        cmd
    }

    /// Run to completion, capturing stdout and stderr
    ///
    /// A non-zero exit is returned as output, not as an error.
    pub async fn run<I, S>(&self, args: I) -> Result<Output>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let child = self
            .command(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::ClientSpawnFailed(format!("{}: {}", self.base[0], e)))?;

        match timeout(Duration::from_secs(self.timeout_secs), child.wait_with_output()).await {
            Ok(output) => Ok(output?),
            Err(_) => Err(Error::ClientTimeout(self.timeout_secs)),
        }
    }

    /// Start in the background with piped stdio
    pub fn spawn<I, S>(&self, args: I) -> Result<Child>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.command(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::ClientSpawnFailed(format!("{}: {}", self.base[0], e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn config() -> RunConfig {
        RunConfig {
            port: "2244".to_string(),
            dbclient: "../dbclient".to_string(),
            dropbear: "../dropbear".to_string(),
            hostkey: Some(PathBuf::from("/tmp/key")),
            remote: None,
            user: None,
        }
    }

    #[test]
    fn test_local_base_args() {
        let client = DbClient::new(&config(), &Settings::default()).unwrap();
        assert_eq!(
            client.base_args(),
            ["../dbclient", "-y", "127.0.5.5", "-p", "2244"]
        );
    }

    #[test]
    fn test_remote_with_user() {
        let mut config = config();
        config.remote = Some("host.example.com".to_string());
        config.port = "22".to_string();
        config.user = Some("alice".to_string());
        config.dbclient = "../dropbearmulti dbclient".to_string();

        let client = DbClient::new(&config, &Settings::default()).unwrap();
        assert_eq!(
            client.base_args(),
            [
                "../dropbearmulti",
                "dbclient",
                "-y",
                "host.example.com",
                "-p",
                "22",
                "-l",
                "alice"
            ]
        );
    }

    #[test]
    fn test_argv_appends_caller_args() {
        let client = DbClient::new(&config(), &Settings::default()).unwrap();
        let argv = client.argv(["echo", "hello"]);
        assert_eq!(&argv[argv.len() - 2..], ["echo", "hello"]);
        assert_eq!(argv.len(), client.base_args().len() + 2);
    }

    #[test]
    fn test_empty_program_rejected() {
        let mut config = config();
        config.dbclient = String::new();
        let err = DbClient::new(&config, &Settings::default()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn test_missing_binary_fails_to_spawn() {
        let mut config = config();
        config.dbclient = "/nonexistent/dbclient".to_string();
        let client = DbClient::new(&config, &Settings::default()).unwrap();

        let err = client.run(["true"]).await.unwrap_err();
        assert!(matches!(err, Error::ClientSpawnFailed(_)));
        assert!(matches!(
            client.spawn(Vec::<String>::new()),
            Err(Error::ClientSpawnFailed(_))
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_captures_output() {
        // `echo` stands in for dbclient and prints the argv it was given
        let mut config = config();
        config.dbclient = "echo".to_string();
        let client = DbClient::new(&config, &Settings::default()).unwrap();

        let output = client.run(["uptime"]).await.unwrap();
        assert!(output.status.success());
        assert_eq!(
            String::from_utf8_lossy(&output.stdout).trim(),
            "-y 127.0.5.5 -p 2244 uptime"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_spawn_runs_in_background() {
        let mut config = config();
        config.dbclient = "echo".to_string();
        config.user = Some("bob".to_string());
        let client = DbClient::new(&config, &Settings::default()).unwrap();

        let child = client.spawn(["x"]).unwrap();
        assert!(child.stdin.is_some());
        let output = child.wait_with_output().await.unwrap();
        assert!(output.status.success());
        assert_eq!(
            String::from_utf8_lossy(&output.stdout).trim(),
            "-y 127.0.5.5 -p 2244 -l bob x"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_timeout() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("slow-dbclient");
        std::fs::write(&script, "#!/bin/sh\nexec sleep 30\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let mut config = config();
        config.dbclient = script.display().to_string();
        let client = DbClient::new(&config, &Settings::default())
            .unwrap()
            .with_timeout(1);

        let err = client.run(["true"]).await.unwrap_err();
        assert!(matches!(err, Error::ClientTimeout(1)));
    }
}
