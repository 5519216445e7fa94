//! Configuration file handling
//!
//! Holds harness settings only. The six run options never come from here.

use serde::Deserialize;
use std::path::Path;

use super::paths::config_path;
use super::{Error, Result};

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
pub struct Settings {
    /// Local server settings
    #[serde(default)]
    pub server: ServerSettings,

    /// Client settings
    #[serde(default)]
    pub client: ClientSettings,
}

/// Settings for a locally launched dropbear
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ServerSettings {
    /// Loopback address the server binds to, and the client dials when no
    /// remote host is given
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Substring of the stderr line that marks the server as ready
    #[serde(default = "default_ready_marker")]
    pub ready_marker: String,

    /// How long to wait for the ready marker
    #[serde(default = "default_startup_timeout")]
    pub startup_timeout_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            ready_marker: default_ready_marker(),
            startup_timeout_secs: default_startup_timeout(),
        }
    }
}

fn default_listen_addr() -> String {
    "127.0.5.5".to_string()
}

fn default_ready_marker() -> String {
    "Not backgrounding".to_string()
}

fn default_startup_timeout() -> u64 {
    10
}

/// Settings for dbclient invocations
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ClientSettings {
    /// Timeout for a foreground client run
    #[serde(default = "default_client_timeout")]
    pub timeout_secs: u64,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_client_timeout(),
        }
    }
}

fn default_client_timeout() -> u64 {
    10
}

impl Settings {
    /// Load settings from the default config file
    ///
    /// Returns default settings if the file doesn't exist
    pub fn load() -> Result<Self> {
        match config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load settings from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::file_read(path, &e))?;
        tracing::debug!(path = %path.display(), "Loaded settings");
        toml::from_str(&content).map_err(|e| Error::ConfigParse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.server.listen_addr, "127.0.5.5");
        assert_eq!(settings.server.ready_marker, "Not backgrounding");
        assert_eq!(settings.server.startup_timeout_secs, 10);
        assert_eq!(settings.client.timeout_secs, 10);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let settings: Settings = toml::from_str(
            r#"
[server]
listen_addr = "127.0.0.1"

[client]
timeout_secs = 3
"#,
        )
        .unwrap();

        assert_eq!(settings.server.listen_addr, "127.0.0.1");
        assert_eq!(settings.server.ready_marker, "Not backgrounding");
        assert_eq!(settings.client.timeout_secs, 3);
    }

    #[test]
    fn test_empty_file_is_default() {
        let settings: Settings = toml::from_str("").unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[server]\nstartup_timeout_secs = 2\n").unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.server.startup_timeout_secs, 2);
    }

    #[test]
    fn test_load_from_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[server]\nstartup_timeout_secs = \"soon\"\n").unwrap();

        let err = Settings::load_from(&path).unwrap_err();
        assert!(matches!(err, Error::ConfigParse(_)));
    }

    #[test]
    fn test_load_from_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Settings::load_from(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, Error::FileRead { .. }));
    }
}
