//! Error types for the test harness
//!
//! Messages name the flag or setting the user has to fix.

use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for dbtest
#[derive(Error, Debug)]
pub enum Error {
    // === Configuration Errors ===
    #[error("--hostkey must be given (required unless --remote)")]
    MissingHostKey,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Server Errors ===
    #[error("Failed to start dropbear: {0}")]
    ServerSpawnFailed(String),

    #[error("dropbear exited before it was ready: {0}")]
    ServerExited(String),

    #[error("dropbear did not report ready within {0} seconds")]
    ServerStartTimeout(u64),

    #[error("Nothing to serve: --remote points at an existing server")]
    NothingToServe,

    // === Client Errors ===
    #[error("Failed to start dbclient: {0}")]
    ClientSpawnFailed(String),

    #[error("dbclient timed out after {0} seconds")]
    ClientTimeout(u64),

    #[error("dbclient failed ({0})")]
    ClientFailed(std::process::ExitStatus),

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a file read error for `path`
    pub fn file_read(path: &std::path::Path, error: &io::Error) -> Self {
        Self::FileRead {
            path: path.display().to_string(),
            error: error.to_string(),
        }
    }
}
