//! Column-label normalization.
//!
//! Labels are reduced to a single lowercase token:
//!
//! 1. hierarchical labels keep only their first component
//! 2. the name is lowercased and spaces become underscores
//! 3. instrument suffixes are removed according to a `SuffixRule`
//!
//! Cell data is never touched.

use std::collections::HashSet;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::cell::Cell;
use super::raw::{ColumnLabel, RawTable};
use crate::error::SchemaError;

/// How instrument suffixes are removed from a lowercased label.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SuffixRule {
    /// Split on `_` and keep the first segment.
    ///
    /// `close_infy.ns` becomes `close`, but so does any legitimate name with an
    /// underscore (`adj_close` becomes `adj`).
    #[default]
    FirstSegment,
    /// Strip a trailing `_<instrument>` only when it matches one of these
    /// identifiers (compared after the same lowercasing).
    KnownSuffix(Vec<String>),
}

/// A table whose labels are canonical lowercase tokens.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedTable {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

/// One row of the `(date, open, close)` chart projection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartRow {
    pub date: NaiveDateTime,
    pub open: Option<f64>,
    pub close: Option<f64>,
}

/// Normalize with the default (`FirstSegment`) suffix rule.
pub fn normalize(raw: &RawTable) -> NormalizedTable {
    normalize_with(raw, &SuffixRule::FirstSegment)
}

/// Normalize with an explicit suffix rule.
pub fn normalize_with(raw: &RawTable, rule: &SuffixRule) -> NormalizedTable {
    let columns: Vec<String> = raw
        .labels()
        .iter()
        .map(|label| canonical_label(label, rule))
        .collect();

    let mut seen = HashSet::new();
    for name in &columns {
        if !seen.insert(name.as_str()) {
            warn!(column = %name, "normalized column label is duplicated; lookups use the first occurrence");
        }
    }

    NormalizedTable {
        columns,
        rows: raw.rows().to_vec(),
    }
}

/// Canonical name for a single label.
pub fn canonical_label(label: &ColumnLabel, rule: &SuffixRule) -> String {
    let name = flatten_name(label.semantic_name());
    strip_suffix(&name, rule)
}

fn flatten_name(name: &str) -> String {
    name.to_lowercase().replace(' ', "_")
}

fn strip_suffix(name: &str, rule: &SuffixRule) -> String {
    match rule {
        SuffixRule::FirstSegment => name.split('_').next().unwrap_or(name).to_string(),
        SuffixRule::KnownSuffix(instruments) => {
            for instrument in instruments {
                let suffix = format!("_{}", flatten_name(instrument));
                if let Some(base) = name.strip_suffix(suffix.as_str()) {
                    if !base.is_empty() {
                        return base.to_string();
                    }
                }
            }
            name.to_string()
        }
    }
}

impl NormalizedTable {
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of the first column with this name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Column index, or `SchemaError::MissingColumn`.
    pub fn require_column(&self, name: &str) -> Result<usize, SchemaError> {
        self.column_index(name)
            .ok_or_else(|| SchemaError::MissingColumn {
                column: name.to_string(),
                available: self.columns.clone(),
            })
    }

    /// The last `n` rows (all rows if there are fewer).
    pub fn tail(&self, n: usize) -> NormalizedTable {
        let start = self.rows.len().saturating_sub(n);
        NormalizedTable {
            columns: self.columns.clone(),
            rows: self.rows[start..].to_vec(),
        }
    }

    /// `(date, open, close)` triples for the raw price chart.
    ///
    /// Rows whose date cannot be read are skipped; unreadable prices become `None`.
    pub fn chart_projection(&self) -> Result<Vec<ChartRow>, SchemaError> {
        let date_idx = self.require_column("date")?;
        let open_idx = self.require_column("open")?;
        let close_idx = self.require_column("close")?;

        Ok(self
            .rows
            .iter()
            .filter_map(|row| {
                let date = row[date_idx].to_timestamp()?.strip_timezone();
                Some(ChartRow {
                    date,
                    open: row[open_idx].to_number(),
                    close: row[close_idx].to_number(),
                })
            })
            .collect())
    }
}

impl From<NormalizedTable> for RawTable {
    fn from(table: NormalizedTable) -> Self {
        let labels = table.columns.into_iter().map(ColumnLabel::Plain).collect();
        RawTable::from_rows(labels, table.rows)
    }
}
