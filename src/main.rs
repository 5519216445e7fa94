//! dbtest - run the dropbear/dbclient end-to-end harness
//!
//! Resolves the run options, then shows them, serves a local dropbear, or
//! runs dbclient against the configured host.

use clap::Parser;
use dbtest::{cli, commands::Commands, common::logging, RunOptions};

#[derive(Parser)]
#[command(name = "dbtest", about = "dropbear/dbclient test harness")]
#[command(version, long_about = None)]
struct Cli {
    #[command(flatten)]
    options: RunOptions,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[tokio::main]
async fn main() {
    logging::init_cli();

    let cli = Cli::parse();

    let command = cli.command.unwrap_or(Commands::Show { json: false });

    if let Err(e) = cli::dispatch(command, cli.options).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
