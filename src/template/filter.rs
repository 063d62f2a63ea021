use crate::{DatasetError, Table};
use std::collections::HashMap;
use tracing::info;

/// Drop rows whose template occurs `threshold` times or fewer.
///
/// Rare templates are noise for downstream model training; the threshold is
/// dataset-dependent (5 for USPTO-sized dumps, 20 for larger ones). The
/// table must carry a `template` column or the call fails.
pub fn filter_by_frequency(table: &mut Table, threshold: u64) -> Result<(), DatasetError> {
    let column = table.require_column("template")?;

    let mut counts: HashMap<String, u64> = HashMap::new();
    for value in table.column(column) {
        *counts.entry(value.to_string()).or_insert(0) += 1;
    }

    let before = table.len();
    table.retain(|row| {
        let value = row.get(column).map(String::as_str).unwrap_or("");
        counts.get(value).copied().unwrap_or(0) > threshold
    });
    info!(
        "template frequency filter (> {threshold}): {} of {before} rows kept",
        table.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labeled(labels: &[&str]) -> Table {
        Table {
            headers: vec!["canonic_rxn".to_string(), "template".to_string()],
            rows: labels
                .iter()
                .enumerate()
                .map(|(i, l)| vec![format!("rxn{i}"), l.to_string()])
                .collect(),
        }
    }

    #[test]
    fn rare_templates_are_dropped() {
        let mut table = labeled(&["t1", "t1", "t1", "t2", "t1"]);
        filter_by_frequency(&mut table, 2).expect("filter failed");
        assert_eq!(table.len(), 4);
        assert!(table.rows.iter().all(|r| r[1] == "t1"));
    }

    #[test]
    fn threshold_is_strict() {
        let mut table = labeled(&["t1", "t1"]);
        filter_by_frequency(&mut table, 2).expect("filter failed");
        assert!(table.is_empty());
    }

    #[test]
    fn missing_template_column_is_fatal() {
        let mut table = Table {
            headers: vec!["canonic_rxn".to_string()],
            rows: vec![vec!["CCO>>CC".to_string()]],
        };
        let err = filter_by_frequency(&mut table, 5).unwrap_err();
        assert!(matches!(err, DatasetError::MissingColumn(ref c) if c == "template"));
    }
}
