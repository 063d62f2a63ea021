use anyhow::Context;
use clap::Parser;
use rxnprep::{clean_dataset, init_logging, CleanConfig, Table};
use std::path::PathBuf;
use tracing::info;

/// Clean a raw mapped-reaction dump into a deduplicated, canonicalised
/// table.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Input CSV with a `rxn_map` column.
    input: PathBuf,

    /// Output CSV; gains a `canonic_rxn` column.
    output: PathBuf,

    /// Only process the first N rows.
    #[arg(long)]
    row_limit: Option<usize>,

    /// Worker threads for the per-row stages.
    #[arg(long, default_value_t = 4)]
    workers: usize,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log: String,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(&args.log);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(args.workers)
        .build()
        .context("failed to build worker pool")?;

    let mut table = Table::read_csv(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;

    let config = CleanConfig {
        row_limit: args.row_limit,
    };
    clean_dataset(&mut table, &pool, &config).context("cleaning pipeline failed")?;

    table
        .write_csv(&args.output)
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    info!("wrote {} rows to {}", table.len(), args.output.display());
    Ok(())
}
