//! Launch harness for the SSH binaries under test
//!
//! Starts a local `dropbear` for local runs and builds `dbclient` command
//! lines that reach either that server or the `--remote` host.

mod client;
mod server;

pub use client::DbClient;
pub use server::{server_argv, DropbearServer};
