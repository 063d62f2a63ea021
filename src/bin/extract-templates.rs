use anyhow::Context;
use clap::{ArgAction, Parser};
use rxnprep::template::{extract_templates, ExtractorSettings};
use rxnprep::{init_logging, Table};
use std::path::PathBuf;
use tracing::info;

/// Label every cleaned reaction with its extracted template and write the
/// template registry alongside.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Input CSV with a `rxn_map` column of mapped `reactants>>product`
    /// strings.
    input: PathBuf,

    /// Output CSV; the input plus a `template` column.
    output: PathBuf,

    /// Registry CSV with one row per distinct template.
    template_info: PathBuf,

    /// Extract retrosynthesis templates (product side first).
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    retro: bool,

    /// Track chirality changes and carry a chiral code in the labels.
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    use_stereo: bool,

    /// Log each failed record.
    #[arg(long)]
    verbose: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log: String,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(&args.log);

    let mut table = Table::read_csv(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    let rxn = table.require_column("rxn_map")?;

    let settings = ExtractorSettings {
        verbose: args.verbose,
        use_stereo: args.use_stereo,
        retro: args.retro,
        ..Default::default()
    };

    let rxns: Vec<String> = table.column(rxn).map(str::to_string).collect();
    let out = extract_templates(rxns.iter().map(String::as_str), &settings);

    table.add_column("template", out.labels);
    table
        .write_csv(&args.output)
        .with_context(|| format!("failed to write {}", args.output.display()))?;

    let registry = out.registry.to_table();
    registry
        .write_csv(&args.template_info)
        .with_context(|| format!("failed to write {}", args.template_info.display()))?;
    info!(
        "labelled {} rows, {} distinct templates",
        table.len(),
        registry.len()
    );
    Ok(())
}
