#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line entry point for the aviation toolchain.
//!
//! `sync` runs the monthly BTS dataset sync and `serve` starts the RPC
//! server. Without a subcommand an interactive menu is shown.
//!
//! Uses `indicatif-log-bridge` (via [`aviation_cli_utils::init_logger`])
//! to route `log` output through `indicatif::MultiProgress` so that log
//! lines and the download bar never fight for the terminal.

mod sync;

use aviation_bts::Period;
use clap::{Parser, Subcommand};
use dialoguer::Select;

#[derive(Parser)]
#[command(name = "aviation_cli", about = "Aviation data toolchain")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Download the next month of BTS on-time data and upload it to the bucket
    Sync {
        /// Fetch this period (`YYYY-MM`) instead of the month after the
        /// latest one in the bucket
        #[arg(long)]
        period: Option<Period>,
        /// Resolve and print the source URL and destination key without
        /// downloading anything
        #[arg(long)]
        dry_run: bool,
    },
    /// Start the RPC server
    Serve,
}

/// Top-level tool selection for the interactive menu.
enum Tool {
    Sync,
    Plan,
    Server,
}

impl Tool {
    const ALL: &[Self] = &[Self::Sync, Self::Plan, Self::Server];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::Sync => "Sync next BTS month",
            Self::Plan => "Show next BTS month (dry run)",
            Self::Server => "Start server",
        }
    }
}

/// Runs the server on actix's own runtime, off the tokio worker threads.
async fn serve(interactive: bool) -> Result<(), Box<dyn std::error::Error>> {
    tokio::task::spawn_blocking(move || {
        actix_web::rt::System::new().block_on(async move {
            if interactive {
                aviation_server::interactive::run().await
            } else {
                aviation_server::run_server(aviation_server::ServerConfig::from_env()).await
            }
        })
    })
    .await??;

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = aviation_cli_utils::init_logger();
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Sync { period, dry_run }) => sync::run(&multi, period, dry_run).await?,
        Some(Commands::Serve) => serve(false).await?,
        None => {
            println!("Aviation Toolchain");
            println!();

            let labels: Vec<&str> = Tool::ALL.iter().map(Tool::label).collect();

            let idx = Select::new()
                .with_prompt("What would you like to do?")
                .items(&labels)
                .default(0)
                .interact()?;

            match Tool::ALL[idx] {
                Tool::Sync => sync::interactive(&multi).await?,
                Tool::Plan => sync::run(&multi, None, true).await?,
                Tool::Server => serve(true).await?,
            }
        }
    }

    Ok(())
}
