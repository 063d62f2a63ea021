use anyhow::Context;
use clap::Parser;
use rxnprep::template::filter_by_frequency;
use rxnprep::{init_logging, Table};
use std::path::PathBuf;
use tracing::info;

/// Drop rows labelled with rare templates.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Input CSV with a `template` column.
    input: PathBuf,

    /// Output CSV.
    output: PathBuf,

    /// Keep only templates seen more than this many times.
    #[arg(long, default_value_t = 5)]
    min_count: u64,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log: String,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(&args.log);

    let mut table = Table::read_csv(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    filter_by_frequency(&mut table, args.min_count)?;
    table
        .write_csv(&args.output)
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    info!("wrote {} rows to {}", table.len(), args.output.display());
    Ok(())
}
