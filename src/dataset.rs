use csv::{ReaderBuilder, StringRecord, Writer};
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("input file not found: {0}")]
    MissingInput(String),
    #[error("no '{0}' column found in csv")]
    MissingColumn(String),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// An in-memory CSV table. Columns the pipeline does not interpret (patent
/// numbers, reaction classes, split labels) ride along untouched; stages only
/// read and write the columns they name.
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<Self, DatasetError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(DatasetError::MissingInput(path.display().to_string()));
        }
        let mut reader = ReaderBuilder::new().has_headers(true).from_path(path)?;
        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let mut rows = Vec::new();
        let mut record = StringRecord::new();
        while reader.read_record(&mut record)? {
            rows.push(record.iter().map(str::to_string).collect());
        }
        Ok(Table { headers, rows })
    }

    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<(), DatasetError> {
        let mut writer = Writer::from_path(path)?;
        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Index of a column the caller cannot proceed without.
    pub fn require_column(&self, name: &str) -> Result<usize, DatasetError> {
        self.column_index(name)
            .ok_or_else(|| DatasetError::MissingColumn(name.to_string()))
    }

    pub fn column(&self, index: usize) -> impl Iterator<Item = &str> + '_ {
        self.rows
            .iter()
            .map(move |row| row.get(index).map(String::as_str).unwrap_or(""))
    }

    /// Set a column; `values` must have one entry per row. An existing
    /// column of the same name is overwritten in place, so re-running a
    /// stage never duplicates headers.
    pub fn add_column(&mut self, name: &str, values: Vec<String>) {
        if let Some(index) = self.column_index(name) {
            self.set_column(index, values);
            return;
        }
        self.headers.push(name.to_string());
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.push(value);
        }
    }

    /// Overwrite an existing column in place.
    pub fn set_column(&mut self, index: usize, values: Vec<String>) {
        for (row, value) in self.rows.iter_mut().zip(values) {
            if let Some(cell) = row.get_mut(index) {
                *cell = value;
            }
        }
    }

    pub fn truncate(&mut self, limit: usize) {
        self.rows.truncate(limit);
    }

    pub fn retain<F: FnMut(&[String]) -> bool>(&mut self, mut keep: F) {
        self.rows.retain(|row| keep(row));
    }

    /// Drop rows whose value in the given column was already seen, keeping
    /// the first occurrence and the original order.
    pub fn dedup_by_column(&mut self, index: usize) {
        let mut seen: HashSet<String> = HashSet::new();
        self.rows.retain(|row| {
            let value = row.get(index).map(String::as_str).unwrap_or("");
            seen.insert(value.to_string())
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table {
            headers: vec!["id".to_string(), "rxn_map".to_string()],
            rows: vec![
                vec!["0".to_string(), "CCO>>CC".to_string()],
                vec!["1".to_string(), "CCN>>CC".to_string()],
                vec!["2".to_string(), "CCO>>CC".to_string()],
            ],
        }
    }

    #[test]
    fn dedup_keeps_first_occurrence() {
        let mut table = sample();
        let col = table.require_column("rxn_map").expect("column missing");
        table.dedup_by_column(col);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[0][0], "0");
        assert_eq!(table.rows[1][0], "1");
    }

    #[test]
    fn require_column_reports_the_name() {
        let table = sample();
        let err = table.require_column("template").unwrap_err();
        assert!(matches!(err, DatasetError::MissingColumn(ref c) if c == "template"));
    }

    #[test]
    fn add_column_extends_every_row() {
        let mut table = sample();
        table.add_column(
            "canonic_rxn",
            vec!["a".to_string(), "b".to_string(), "c".to_string()],
        );
        assert_eq!(table.headers.len(), 3);
        assert!(table.rows.iter().all(|r| r.len() == 3));
    }

    #[test]
    fn add_column_overwrites_an_existing_one() {
        let mut table = sample();
        table.add_column(
            "template",
            vec!["t1".to_string(), "t2".to_string(), "t3".to_string()],
        );
        table.add_column(
            "template",
            vec!["u1".to_string(), "u2".to_string(), "u3".to_string()],
        );
        assert_eq!(table.headers.len(), 3);
        assert_eq!(
            table.headers.iter().filter(|h| *h == "template").count(),
            1
        );
        let col = table.require_column("template").expect("column missing");
        let values: Vec<&str> = table.column(col).collect();
        assert_eq!(values, vec!["u1", "u2", "u3"]);
    }

    #[test]
    fn csv_roundtrip() {
        let table = sample();
        let path = std::env::temp_dir().join("rxnprep_table_roundtrip.csv");
        table.write_csv(&path).expect("write failed");
        let back = Table::read_csv(&path).expect("read failed");
        assert_eq!(back.headers, table.headers);
        assert_eq!(back.rows, table.rows);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn missing_file_is_input_fatal() {
        let err = Table::read_csv("/nonexistent/rxnprep.csv").unwrap_err();
        assert!(matches!(err, DatasetError::MissingInput(_)));
    }
}
