use crate::{
    canonicalise, join_reactants_reagents, multiproduct_fixer, no_carbon, product_in_reactants,
    reactant_count_filter, remove_fragment_info, remove_mapping, remove_reagents,
    remove_stereoalchemy, untangle_tildes, DatasetError, Rejection, Table,
};
use rayon::prelude::*;
use rayon::ThreadPool;
use tracing::{debug, info};

/// Longest canonical reaction string a row may keep.
pub const MAX_REACTION_LENGTH: usize = 512;

#[derive(Debug, Clone, Default)]
pub struct CleanConfig {
    /// Process only the first N rows. Off by default; useful for smoke runs
    /// on large dumps.
    pub row_limit: Option<usize>,
}

/// Run the full cleaning pipeline over a table holding mapped reactions in
/// its `rxn_map` column.
///
/// Stages run in a fixed order, each as a complete barrier over the whole
/// table; per-row work is fanned out over the supplied pool. Rows that any
/// filter rejects are dropped, and the surviving canonical unmapped form is
/// appended as the `canonic_rxn` column.
pub fn clean_dataset(
    table: &mut Table,
    pool: &ThreadPool,
    config: &CleanConfig,
) -> Result<(), DatasetError> {
    let rxn = table.require_column("rxn_map")?;
    info!("loaded {} rows", table.len());

    if let Some(limit) = config.row_limit {
        table.truncate(limit);
        info!("row limit applied: {} rows", table.len());
    }

    // Malformed role structure first, so later stages can assume two
    // separators.
    table.retain(|row| cell(row, rxn).matches('>').count() == 2);
    table.dedup_by_column(rxn);
    info!("role separators: {} rows", table.len());

    map_stage(table, pool, rxn, "untangle tildes", untangle_tildes);
    table.dedup_by_column(rxn);

    map_stage(table, pool, rxn, "join reagents", join_reactants_reagents);
    table.dedup_by_column(rxn);

    map_stage(
        table,
        pool,
        rxn,
        "remove fragment info",
        remove_fragment_info,
    );
    table.dedup_by_column(rxn);

    map_stage(table, pool, rxn, "remove reagents", remove_reagents);
    table.dedup_by_column(rxn);

    filter_stage(table, pool, rxn, "reactant count", reactant_count_filter);
    filter_stage(table, pool, rxn, "multiproduct fixer", multiproduct_fixer);

    filter_stage(table, pool, rxn, "organic product", no_carbon);
    table.dedup_by_column(rxn);

    map_stage(table, pool, rxn, "stereo removal", remove_stereoalchemy);
    table.dedup_by_column(rxn);

    filter_stage(
        table,
        pool,
        rxn,
        "product in reactants",
        product_in_reactants,
    );
    table.dedup_by_column(rxn);

    filter_stage(table, pool, rxn, "canonicalise", canonicalise);

    // The unmapped canonical form becomes its own column; rows whose maps
    // cannot be stripped are dropped.
    let results: Vec<Result<String, Rejection>> = pool.install(|| {
        table
            .rows
            .par_iter()
            .map(|row| remove_mapping(cell(row, rxn)))
            .collect()
    });
    let mut kept_rows = Vec::with_capacity(table.rows.len());
    let mut canonic = Vec::with_capacity(table.rows.len());
    for (row, result) in table.rows.drain(..).zip(results) {
        match result {
            Ok(value) => {
                kept_rows.push(row);
                canonic.push(value);
            }
            Err(reason) => debug!("dropped row: {reason}"),
        }
    }
    table.rows = kept_rows;
    table.add_column("canonic_rxn", canonic);
    let canon = table
        .column_index("canonic_rxn")
        .unwrap_or(table.headers.len() - 1);
    info!("remove mapping: {} rows", table.len());

    table.retain(|row| cell(row, canon).len() <= MAX_REACTION_LENGTH);
    info!("length filter: {} rows", table.len());

    table.dedup_by_column(canon);
    info!("final dedup: {} rows", table.len());

    Ok(())
}

fn cell(row: &[String], index: usize) -> &str {
    row.get(index).map(String::as_str).unwrap_or("")
}

fn map_stage<F>(table: &mut Table, pool: &ThreadPool, column: usize, name: &str, transform: F)
where
    F: Fn(&str) -> String + Sync,
{
    let values: Vec<String> = pool.install(|| {
        table
            .rows
            .par_iter()
            .map(|row| transform(cell(row, column)))
            .collect()
    });
    table.set_column(column, values);
    info!("{name}: {} rows", table.len());
}

fn filter_stage<F>(table: &mut Table, pool: &ThreadPool, column: usize, name: &str, filter: F)
where
    F: Fn(&str) -> Result<String, Rejection> + Sync,
{
    let results: Vec<Result<String, Rejection>> = pool.install(|| {
        table
            .rows
            .par_iter()
            .map(|row| filter(cell(row, column)))
            .collect()
    });
    let mut dropped = 0usize;
    let mut kept = Vec::with_capacity(table.rows.len());
    for (mut row, result) in table.rows.drain(..).zip(results) {
        match result {
            Ok(value) => {
                if let Some(slot) = row.get_mut(column) {
                    *slot = value;
                }
                kept.push(row);
            }
            Err(reason) => {
                dropped += 1;
                debug!("dropped row: {reason}");
            }
        }
    }
    table.rows = kept;
    info!("{name}: {} rows ({dropped} dropped)", table.len());
}
