//! Common utilities shared by the option layer, the harness and the CLI

pub mod config;
pub mod error;
pub mod logging;
pub mod paths;

pub use config::Settings;
pub use error::{Error, Result};

/// Split a configured program string into argv.
///
/// Multi-call binaries are configured as e.g. `"dropbearmulti dropbear"`.
pub fn split_program(program: &str) -> Vec<String> {
    program.split_whitespace().map(str::to_string).collect()
}
