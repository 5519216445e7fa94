//! dbtest - options and launch harness for the dropbear test suite
//!
//! Declares and validates the command-line options of a test run against
//! an external `dropbear` server and `dbclient` client, and launches those
//! binaries with the resolved configuration.

pub mod cli;
pub mod commands;
pub mod common;
pub mod harness;
pub mod options;

pub use common::{Error, Result};
pub use options::{finalize, register, RunConfig, RunOptions};
