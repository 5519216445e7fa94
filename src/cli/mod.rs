//! CLI command handling
//!
//! Every command resolves the run options first, so a missing `--hostkey`
//! aborts before any process is launched.

use std::io::Write;

use colored::Colorize;

use crate::commands::Commands;
use crate::common::{Error, Result, Settings};
use crate::harness::{DbClient, DropbearServer};
use crate::options::{finalize, RunConfig, RunOptions};

/// Dispatch a CLI command
pub async fn dispatch(command: Commands, options: RunOptions) -> Result<()> {
    let config = finalize(options)?;

    match command {
        Commands::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                print_config(&config, &Settings::load()?);
            }
            Ok(())
        }

        Commands::Serve => {
            if config.is_remote() {
                return Err(Error::NothingToServe);
            }
            let settings = Settings::load()?;
            let server = DropbearServer::start(&config, &settings.server)
                .await?
                .ok_or(Error::NothingToServe)?;

            println!(
                "{} dropbear listening on {} (Ctrl-C to stop)",
                "✓".green(),
                server.addr().bold()
            );
            tokio::signal::ctrl_c().await?;
            server.stop().await
        }

        Commands::Client { args, timeout } => {
            let settings = Settings::load()?;
            let mut client = DbClient::new(&config, &settings)?;
            if let Some(secs) = timeout {
                client = client.with_timeout(secs);
            }

            let server = DropbearServer::start(&config, &settings.server).await?;
            let result = client.run(&args).await;
            if let Some(server) = server {
                if let Err(e) = server.stop().await {
                    tracing::warn!(error = %e, "Failed to stop dropbear");
                }
            }

            let output = result?;
            std::io::stdout().write_all(&output.stdout)?;
            std::io::stderr().write_all(&output.stderr)?;

            if output.status.success() {
                Ok(())
            } else {
                Err(Error::ClientFailed(output.status))
            }
        }
    }
}

fn print_config(config: &RunConfig, settings: &Settings) {
    let unset = || "-".dimmed().to_string();
    let hostkey = config
        .hostkey
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(unset);

    println!("{}", "Run configuration:".blue().bold());
    println!("  port      {}", config.port);
    println!("  dbclient  {}", config.dbclient);
    println!("  dropbear  {}", config.dropbear);
    println!("  hostkey   {}", hostkey);
    println!(
        "  remote    {}",
        config.remote.clone().unwrap_or_else(unset)
    );
    println!("  user      {}", config.user.clone().unwrap_or_else(unset));

    let target = match &config.remote {
        Some(host) => format!("remote {}:{}", host, config.port),
        None => format!("local {}:{}", settings.server.listen_addr, config.port),
    };
    println!("  {}    {}", "target".cyan(), target);
}
