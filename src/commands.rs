//! CLI command definitions

use clap::Subcommand;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the resolved run configuration
    Show {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Start the local dropbear and keep it running until Ctrl-C
    Serve,

    /// Run dbclient against the configured host
    Client {
        /// Arguments passed to dbclient after the connection flags
        #[arg(last = true)]
        args: Vec<String>,

        /// Override the client timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,
    },
}
