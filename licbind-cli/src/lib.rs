//! Command handling for the `licbind` binary.
//!
//! Commands write their human-readable summary to the supplied writer;
//! diagnostics go through `tracing`.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use licbind_license::{
    format_timestamp, parse_term, CreateLicenseRequest, LicenseInfo, LicenseManager,
    LicenseRecord,
};
use std::io::Write;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "licbind")]
#[command(about = "Create, check and revoke machine-bound licenses")]
pub struct Cli {
    /// Enable verbose debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// License directory (overrides LICENSE_DIR)
    #[arg(short, long, global = true)]
    pub dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print this machine's id
    #[command(alias = "pcid")]
    MachineId,

    /// Issue a license for this machine
    Create {
        /// Product name
        product: String,
        /// Number of usage days, or "lifetime"
        term: String,
    },

    /// Validate a license and record this use
    Check {
        /// Product name
        product: String,
    },

    /// Show a license without recording a use
    View {
        /// Product name
        product: String,
    },

    /// Irreversibly destroy a license
    Revoke {
        /// Product name
        product: String,
    },

    /// List license files in the license directory
    List,
}

impl Command {
    /// Whether the command needs a master secret and a license directory.
    #[must_use]
    pub fn needs_manager(&self) -> bool {
        !matches!(self, Self::MachineId)
    }
}

/// Prints the machine id.
pub fn print_machine_id(machine_id: &str, out: &mut impl Write) -> Result<()> {
    writeln!(out, "Machine ID: {machine_id}")?;
    Ok(())
}

/// Runs a license command against `manager`.
pub fn run(command: &Command, manager: &LicenseManager, out: &mut impl Write) -> Result<()> {
    match command {
        Command::MachineId => print_machine_id(manager.machine_id(), out),
        Command::Create { product, term } => {
            let term = parse_term(term)?;
            let record = manager
                .create(&CreateLicenseRequest::new(product.as_str(), term))
                .with_context(|| format!("failed to create license for {product}"))?;
            print_created(manager, &record, out)
        }
        Command::Check { product } => {
            let info = manager
                .info(product)
                .with_context(|| format!("license check failed for {product}"))?;
            print_info(&info, out)
        }
        Command::View { product } => {
            let record = manager
                .view(product)
                .with_context(|| format!("failed to read license for {product}"))?;
            print_record(&record, out)
        }
        Command::Revoke { product } => {
            manager
                .revoke(product)
                .with_context(|| format!("failed to revoke license for {product}"))?;
            writeln!(out, "License revoked: {product}")?;
            Ok(())
        }
        Command::List => {
            let files = manager.list().context("failed to list licenses")?;
            if files.is_empty() {
                writeln!(out, "No licenses in {}", manager.config().license_dir.display())?;
            }
            for file in files {
                let name = file.file_name().map(|n| n.to_string_lossy().into_owned());
                writeln!(out, "{}", name.unwrap_or_else(|| file.display().to_string()))?;
            }
            Ok(())
        }
    }
}

fn term_label(is_lifetime: bool, max_days: u32) -> String {
    if is_lifetime {
        "Lifetime".to_string()
    } else {
        format!("{max_days} days")
    }
}

fn or_never(value: &str) -> &str {
    if value.is_empty() { "never" } else { value }
}

fn print_created(manager: &LicenseManager, record: &LicenseRecord, out: &mut impl Write) -> Result<()> {
    let path = manager.license_path(&record.product_name);
    let file = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    writeln!(out, "License created: {file}")?;
    writeln!(out, "  Machine ID: {}", record.machine_id)?;
    writeln!(out, "  Serial:     {}", record.serial)?;
    writeln!(out, "  Type:       {}", term_label(record.is_lifetime, record.max_days))?;
    writeln!(out, "  Product:    {}", record.product_name)?;
    writeln!(out, "  Created:    {}", format_timestamp(record.created_at))?;
    Ok(())
}

fn print_info(info: &LicenseInfo, out: &mut impl Write) -> Result<()> {
    writeln!(out, "License is valid: {}", info.product_name)?;
    writeln!(out, "  Type:        {}", term_label(info.is_lifetime, info.max_days))?;
    if info.is_lifetime {
        writeln!(out, "  Used days:   {}", info.used_days)?;
    } else {
        writeln!(out, "  Used days:   {} of {}", info.used_days, info.max_days)?;
        writeln!(out, "  Remaining:   {}", info.remaining_days)?;
    }
    writeln!(out, "  Runs:        {}", info.run_count)?;
    writeln!(out, "  First run:   {}", or_never(&info.first_run_date))?;
    writeln!(out, "  Last used:   {}", or_never(&info.last_used_date))?;
    writeln!(out, "  History:     {}", info.usage_history.join(", "))?;
    Ok(())
}

fn print_record(record: &LicenseRecord, out: &mut impl Write) -> Result<()> {
    writeln!(out, "Product:     {}", record.product_name)?;
    writeln!(out, "  Serial:      {}", record.serial)?;
    writeln!(out, "  Machine ID:  {}", record.machine_id)?;
    writeln!(out, "  Type:        {}", term_label(record.is_lifetime, record.max_days))?;
    writeln!(out, "  Activated:   {}", if record.is_activated { "yes" } else { "no" })?;
    writeln!(out, "  Created:     {}", format_timestamp(record.created_at))?;
    writeln!(out, "  Used days:   {}", record.used_days())?;
    if !record.is_lifetime {
        writeln!(out, "  Remaining:   {}", record.remaining_days())?;
    }
    writeln!(out, "  Runs:        {}", record.run_count)?;
    writeln!(out, "  First run:   {}", or_never(&record.first_run_date))?;
    writeln!(out, "  Last used:   {}", or_never(&record.last_used_date))?;
    writeln!(out, "  History:     {}", record.usage_history.join(", "))?;
    Ok(())
}
