//! Raw tables as delivered by a price source.

use serde::{Deserialize, Serialize};

use super::cell::Cell;

/// A column label as produced by the source.
///
/// Multi-instrument downloads label columns with a pair such as
/// `("Close", "INFY.NS")`; the first component is the field name and the rest
/// identifies the instrument.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnLabel {
    Plain(String),
    Hierarchical(Vec<String>),
}

impl ColumnLabel {
    pub fn plain(name: impl Into<String>) -> Self {
        ColumnLabel::Plain(name.into())
    }

    pub fn pair(field: impl Into<String>, instrument: impl Into<String>) -> Self {
        ColumnLabel::Hierarchical(vec![field.into(), instrument.into()])
    }

    /// The part of the label that names the field.
    pub fn semantic_name(&self) -> &str {
        match self {
            ColumnLabel::Plain(name) => name,
            ColumnLabel::Hierarchical(parts) => parts.first().map(String::as_str).unwrap_or(""),
        }
    }
}

impl std::fmt::Display for ColumnLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColumnLabel::Plain(name) => write!(f, "{name}"),
            ColumnLabel::Hierarchical(parts) => write!(f, "({})", parts.join(", ")),
        }
    }
}

/// A rectangular table with source-specific labels.
///
/// Rows are always exactly as wide as the label list: short rows are padded
/// with `Cell::Missing` and extra cells are dropped on insertion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTable {
    labels: Vec<ColumnLabel>,
    rows: Vec<Vec<Cell>>,
}

impl RawTable {
    pub fn new(labels: Vec<ColumnLabel>) -> Self {
        Self {
            labels,
            rows: Vec::new(),
        }
    }

    pub fn from_rows(labels: Vec<ColumnLabel>, rows: Vec<Vec<Cell>>) -> Self {
        let mut table = Self::new(labels);
        for row in rows {
            table.push_row(row);
        }
        table
    }

    pub fn push_row(&mut self, mut row: Vec<Cell>) {
        row.resize(self.labels.len(), Cell::Missing);
        self.rows.push(row);
    }

    pub fn labels(&self) -> &[ColumnLabel] {
        &self.labels
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_are_padded_and_truncated_to_label_width() {
        let mut table = RawTable::new(vec![ColumnLabel::plain("Date"), ColumnLabel::plain("Close")]);
        table.push_row(vec![Cell::Text("2024-01-01".to_string())]);
        table.push_row(vec![Cell::Number(1.0), Cell::Number(2.0), Cell::Number(3.0)]);

        assert_eq!(table.rows()[0], vec![Cell::Text("2024-01-01".to_string()), Cell::Missing]);
        assert_eq!(table.rows()[1], vec![Cell::Number(1.0), Cell::Number(2.0)]);
    }

    #[test]
    fn semantic_name_uses_first_component() {
        assert_eq!(ColumnLabel::pair("Close", "INFY.NS").semantic_name(), "Close");
        assert_eq!(ColumnLabel::pair("Date", "").semantic_name(), "Date");
        assert_eq!(ColumnLabel::Hierarchical(Vec::new()).semantic_name(), "");
        assert_eq!(ColumnLabel::plain("Adj Close").semantic_name(), "Adj Close");
    }
}
