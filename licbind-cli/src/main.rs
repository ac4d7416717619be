//! `licbind`: machine-bound license tool.
//!
//! Usage:
//!   licbind machine-id
//!   licbind create "My Product" 30
//!   licbind check "My Product"
//!
//! Reads `LICENSE_MASTER_KEY` (required for everything but `machine-id`) and
//! the optional `LICENSE_DIR`, `LICENSE_DEFAULT_DAYS`, `LICENSE_LIFETIME_DAYS`
//! from the environment or a `.env` file.

use anyhow::{Context, Result};
use clap::Parser;
use licbind_cli::{print_machine_id, run, Cli};
use licbind_license::{HardwareMachineId, LicenseConfig, LicenseManager, MachineIdSource};
use std::io;
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(io::stderr)
        .compact()
        .init();

    if let Ok(path) = dotenvy::dotenv() {
        debug!("Loaded environment from {}", path.display());
    }

    let mut stdout = io::stdout().lock();

    if !cli.command.needs_manager() {
        let machine_id = HardwareMachineId
            .machine_id()
            .context("failed to determine machine id")?;
        return print_machine_id(&machine_id, &mut stdout);
    }

    let mut config = LicenseConfig::from_env().context("failed to load configuration")?;
    if let Some(dir) = cli.dir.clone() {
        config.license_dir = dir;
    }
    debug!(dir = %config.license_dir.display(), "Using license directory");

    let manager = LicenseManager::new(config, &HardwareMachineId)
        .context("failed to initialize license manager")?;
    run(&cli.command, &manager, &mut stdout)
}
