//! CSV ingest into a `RawTable`.
//!
//! Two layouts are supported:
//!
//! - one header row: plain labels (`Date,Open,Close,...`)
//! - two header rows: hierarchical labels, field names on the first row and
//!   instrument identifiers on the second (`Close` / `INFY.NS`)
//!
//! Cells are kept as text; empty cells become `Cell::Missing`. Coercion is
//! left to the series extractor.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use csv::StringRecord;
use tracing::info;

use crate::data::{FetchKey, PriceSource};
use crate::error::FetchError;
use crate::table::{Cell, ColumnLabel, RawTable};

/// Read a CSV file with `header_rows` (1 or 2) header lines.
pub fn read_raw_table(path: &Path, header_rows: usize) -> Result<RawTable, FetchError> {
    let file = File::open(path)
        .map_err(|e| FetchError::Io(format!("failed to open CSV '{}': {e}", path.display())))?;
    parse_raw_table(file, header_rows)
        .map_err(|e| FetchError::Io(format!("failed to read CSV '{}': {e}", path.display())))
}

/// Parse CSV text from any reader.
pub fn parse_raw_table<R: Read>(reader: R, header_rows: usize) -> Result<RawTable, String> {
    if !(1..=2).contains(&header_rows) {
        return Err(format!("header rows must be 1 or 2, got {header_rows}"));
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut records = reader.records();
    let mut headers: Vec<StringRecord> = Vec::with_capacity(header_rows);
    for _ in 0..header_rows {
        match records.next() {
            Some(record) => headers.push(record.map_err(|e| e.to_string())?),
            None => return Err("missing header row".to_string()),
        }
    }

    let labels = build_labels(&headers);
    let mut table = RawTable::new(labels);
    for record in records {
        let record = record.map_err(|e| e.to_string())?;
        table.push_row(record.iter().map(to_cell).collect());
    }
    Ok(table)
}

fn build_labels(headers: &[StringRecord]) -> Vec<ColumnLabel> {
    let width = headers.iter().map(StringRecord::len).max().unwrap_or(0);
    (0..width)
        .map(|i| {
            let parts: Vec<String> = headers
                .iter()
                .map(|h| clean_header(h.get(i).unwrap_or("")))
                .collect();
            match parts.as_slice() {
                [single] => ColumnLabel::plain(single.clone()),
                _ => ColumnLabel::Hierarchical(parts),
            }
        })
        .collect()
}

fn clean_header(name: &str) -> String {
    // spreadsheet exports may prefix a BOM
    name.trim().trim_start_matches('\u{feff}').to_string()
}

fn to_cell(value: &str) -> Cell {
    if value.is_empty() {
        Cell::Missing
    } else {
        Cell::Text(value.to_string())
    }
}

/// A local CSV file as a price source. The fetch key is ignored.
#[derive(Debug, Clone)]
pub struct CsvSource {
    pub path: PathBuf,
    pub header_rows: usize,
}

impl CsvSource {
    pub fn new(path: impl Into<PathBuf>, header_rows: usize) -> Self {
        Self {
            path: path.into(),
            header_rows,
        }
    }
}

impl PriceSource for CsvSource {
    fn fetch(&self, key: &FetchKey) -> Result<RawTable, FetchError> {
        let table = read_raw_table(&self.path, self.header_rows)?;
        info!(
            path = %self.path.display(),
            instrument = %key.instrument,
            rows = table.row_count(),
            "loaded CSV"
        );
        Ok(table)
    }
}
