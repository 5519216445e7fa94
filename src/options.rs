//! Run options for the dropbear/dbclient test suite
//!
//! [`register`] declares the flags, [`finalize`] checks them once after
//! parsing and fills in the default port. The resolved [`RunConfig`] is
//! read-only from then on.

use clap::{Args, Command};
use serde::Serialize;
use std::path::PathBuf;

use crate::common::{Error, Result};

/// Port a locally launched server listens on
pub const LOCAL_PORT: &str = "2244";
/// Port used against a remote host
pub const REMOTE_PORT: &str = "22";
/// Default client binary, relative to the test directory
pub const DEFAULT_DBCLIENT: &str = "../dbclient";
/// Default server binary, relative to the test directory
pub const DEFAULT_DROPBEAR: &str = "../dropbear";

/// Raw command-line options, as parsed
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// default is 2244 local, 22 remote
    #[arg(long, global = true)]
    pub port: Option<String>,

    /// Client binary (may be "dropbearmulti dbclient")
    #[arg(long, global = true, default_value = DEFAULT_DBCLIENT)]
    pub dbclient: String,

    /// Server binary (may be "dropbearmulti dropbear")
    #[arg(long, global = true, default_value = DEFAULT_DROPBEAR)]
    pub dropbear: String,

    /// required unless --remote
    #[arg(long, global = true)]
    pub hostkey: Option<String>,

    /// remote host
    #[arg(long, global = true)]
    pub remote: Option<String>,

    /// optional username
    #[arg(long, global = true)]
    pub user: Option<String>,
}

/// Add the run options to an existing command
pub fn register(cmd: Command) -> Command {
    RunOptions::augment_args(cmd)
}

/// Resolved run configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunConfig {
    pub port: String,
    pub dbclient: String,
    pub dropbear: String,
    pub hostkey: Option<PathBuf>,
    pub remote: Option<String>,
    pub user: Option<String>,
}

impl RunConfig {
    /// Whether the tests run against an already running remote server
    pub fn is_remote(&self) -> bool {
        self.remote.is_some()
    }
}

/// Validate parsed options and fill in the port
///
/// Fails with [`Error::MissingHostKey`] when neither a host key nor a remote
/// host was given. A remote host takes precedence for the default port even
/// when a host key is also present.
pub fn finalize(options: RunOptions) -> Result<RunConfig> {
    let hostkey = non_empty(options.hostkey);
    let remote = non_empty(options.remote);

    if hostkey.is_none() && remote.is_none() {
        return Err(Error::MissingHostKey);
    }

    let port = non_empty(options.port).unwrap_or_else(|| {
        if remote.is_some() {
            REMOTE_PORT.to_string()
        } else {
            LOCAL_PORT.to_string()
        }
    });

    let config = RunConfig {
        port,
        dbclient: options.dbclient,
        dropbear: options.dropbear,
        hostkey: hostkey.map(PathBuf::from),
        remote,
        user: non_empty(options.user),
    };
    tracing::debug!(?config, "Resolved run configuration");
    Ok(config)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
