//! Remote Backup - Main entry point
//!
//! Backs up every host listed in the configuration file, then exits.

use anyhow::{Context, Result};
use clap::Parser;
use remote_backup::daemon::shutdown::{ShutdownCoordinator, INTERRUPTED_EXIT_CODE};
use remote_backup::{utils, BackupRunner, Config, RunOptions};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the backup definition (JSON or TOML)
    #[arg(value_name = "FILE")]
    config: PathBuf,

    /// Only back up this host id (repeatable)
    #[arg(long = "host", value_name = "ID")]
    hosts: Vec<String>,

    /// Compare and list only; write, transfer and delete nothing
    #[arg(long)]
    dry_run: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let _ = dotenvy::dotenv();

    utils::logger::init(&args.log_level)?;

    let mut config = Config::from_file(&args.config)
        .with_context(|| format!("loading config file {}", args.config.display()))?;
    config.apply_env_overrides();

    tracing::info!(
        "Starting remote-backup v{} ({} hosts configured)",
        env!("CARGO_PKG_VERSION"),
        config.items.len()
    );

    let runner = BackupRunner::over_ssh(
        config,
        RunOptions {
            dry_run: args.dry_run,
            hosts: args.hosts,
        },
    )?;

    let shutdown = ShutdownCoordinator::new();
    let cancel = shutdown.token();
    let slot = shutdown.session_slot();

    // ssh2 is blocking; the whole run lives on one blocking thread.
    let mut run = tokio::task::spawn_blocking(move || runner.run(&cancel, &slot));

    tokio::select! {
        joined = &mut run => {
            let summary = joined.context("backup run panicked")??;
            // Each failed host was already logged by the runner.
            if !summary.is_success() {
                std::process::exit(1);
            }
            Ok(())
        }
        _ = shutdown.wait_for_signal() => {
            shutdown.interrupt();
            std::process::exit(INTERRUPTED_EXIT_CODE);
        }
    }
}
