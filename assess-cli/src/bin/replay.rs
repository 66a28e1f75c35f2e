use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result};
use assess_cli::SessionLoader;
use assess_core::AssessmentLedger;
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

/// Replay a CSV session file against a fresh assessment ledger.
///
/// The session file should have the following columns:
/// - op: register, pay, update-income, details, transfer-admin
/// - sender: the identity making the call
/// - arg: the entity to register, or the new admin
/// - amount: the income for register / update-income
/// - timestamp: the payment time for pay (empty means now)
#[derive(Parser, Debug)]
#[command(name = "assess-replay")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the CSV session file
    #[arg(short, long)]
    file: PathBuf,

    /// Initial admin identity for the ledger
    #[arg(short, long, default_value = "admin")]
    admin: String,

    /// Output format for row outcomes
    #[arg(long, value_enum, default_value = "plain")]
    format: Format,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Format {
    Plain,
    Json,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let file = File::open(&args.file)
        .with_context(|| format!("Failed to open: {}", args.file.display()))?;

    let records = SessionLoader::parse(file)
        .with_context(|| format!("Failed to parse session file: {}", args.file.display()))?;

    let mut ledger = AssessmentLedger::new(&args.admin);
    let outcomes = SessionLoader::replay(&mut ledger, &records)
        .context("Failed to replay session")?;

    match args.format {
        Format::Plain => {
            for (record, outcome) in records.iter().zip(&outcomes) {
                println!("{:<14} {:<40} {}", record.op.as_str(), record.sender, outcome);
            }
        }
        Format::Json => {
            for outcome in &outcomes {
                println!(
                    "{}",
                    serde_json::to_string(outcome).context("Failed to serialize outcome")?
                );
            }
        }
    }

    Ok(())
}
