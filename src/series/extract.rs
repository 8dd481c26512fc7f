//! Extraction of a validated series from a normalized table.
//!
//! Two columns are projected (timestamp and value) and coerced in two passes:
//!
//! 1. values: rows whose value cannot be read as a finite number are dropped
//! 2. timestamps: surviving rows whose timestamp cannot be parsed are dropped
//!
//! Timezone offsets are then stripped from every surviving timestamp.
//! Row order is preserved.

use tracing::{debug, warn};

use super::types::{SeriesPoint, TIMESTAMP_FIELD, TimeSeries, VALUE_FIELD};
use crate::error::SchemaError;
use crate::table::{Cell, NormalizedTable};

/// Number of rows kept in diagnostic snapshots.
pub const SNAPSHOT_ROWS: usize = 5;

/// Result of a successful extraction.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub series: TimeSeries,
    /// Rows in the input table.
    pub input_rows: usize,
    /// Rows dropped in the value pass.
    pub dropped_invalid_value: usize,
    /// Rows dropped in the timestamp pass.
    pub dropped_invalid_timestamp: usize,
    /// First rows of the two-column projection, before coercion.
    pub renamed_head: Vec<(Cell, Cell)>,
}

impl Extraction {
    pub fn dropped(&self) -> usize {
        self.dropped_invalid_value + self.dropped_invalid_timestamp
    }
}

/// Project, coerce, and validate `(timestamp_col, value_col)` from `table`.
///
/// Fails only when a named column is absent. A table whose rows are all
/// invalid (or that has no rows) yields an empty series.
pub fn extract(
    table: &NormalizedTable,
    timestamp_col: &str,
    value_col: &str,
) -> Result<Extraction, SchemaError> {
    let ts_idx = table.require_column(timestamp_col)?;
    let value_idx = table.require_column(value_col)?;

    let projected: Vec<(&Cell, &Cell)> = table
        .rows()
        .iter()
        .map(|row| (&row[ts_idx], &row[value_idx]))
        .collect();
    let input_rows = projected.len();

    let renamed_head: Vec<(Cell, Cell)> = projected
        .iter()
        .take(SNAPSHOT_ROWS)
        .map(|(ts, y)| ((*ts).clone(), (*y).clone()))
        .collect();
    debug!(
        rows = input_rows,
        head = ?renamed_head,
        "projected `{timestamp_col}` -> `{TIMESTAMP_FIELD}`, `{value_col}` -> `{VALUE_FIELD}`"
    );

    let with_values: Vec<(&Cell, f64)> = projected
        .into_iter()
        .filter_map(|(ts, y)| y.to_number().map(|v| (ts, v)))
        .collect();
    let dropped_invalid_value = input_rows - with_values.len();

    let after_value_pass = with_values.len();
    let points: Vec<SeriesPoint> = with_values
        .into_iter()
        .filter_map(|(ts, y)| ts.to_timestamp().map(|parsed| (parsed, y)))
        .map(|(parsed, y)| SeriesPoint {
            ds: parsed.strip_timezone(),
            y,
        })
        .collect();
    let dropped_invalid_timestamp = after_value_pass - points.len();

    if dropped_invalid_value + dropped_invalid_timestamp > 0 {
        warn!(
            dropped_invalid_value,
            dropped_invalid_timestamp, "dropped rows that failed coercion"
        );
    }

    let series = TimeSeries::from_points(points);
    debug!(rows = series.len(), head = ?series.head(SNAPSHOT_ROWS), "series after timezone removal");

    Ok(Extraction {
        series,
        input_rows,
        dropped_invalid_value,
        dropped_invalid_timestamp,
        renamed_head,
    })
}
