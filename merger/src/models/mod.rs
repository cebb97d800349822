//! Domain models shared by the transform and workbook layers.
//!
//! - [`Cell`] - a single spreadsheet value
//! - [`RecordSet`] - one input file after normalization, ready to become a sheet

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Cell
// =============================================================================

/// A single cell value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Cell {
    #[default]
    Empty,
    Number(f64),
    Text(String),
    Bool(bool),
    /// Spreadsheet serial date, written back with a date format
    DateTime(f64),
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Number(n) => write!(f, "{}", n),
            Cell::Text(s) => write!(f, "{}", s),
            Cell::Bool(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            Cell::DateTime(serial) => write!(f, "{}", serial),
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<f64> for Cell {
    fn from(n: f64) -> Self {
        Cell::Number(n)
    }
}

// =============================================================================
// Record Set
// =============================================================================

/// Normalized contents of one input file.
///
/// Every row has exactly `columns.len()` cells, in column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordSet {
    /// Source file name
    pub name: String,
    /// Output column names
    pub columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl RecordSet {
    /// Empty record set with the given schema.
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            columns,
            rows: Vec::new(),
        }
    }

    /// Append a row, padding or cutting it to the schema width.
    pub fn push_row(&mut self, mut row: Vec<Cell>) {
        row.resize(self.columns.len(), Cell::Empty);
        self.rows.push(row);
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// Value of `column` in row `row`.
    pub fn get(&self, row: usize, column: &str) -> Option<&Cell> {
        let col = self.column_index(column)?;
        self.rows.get(row)?.get(col)
    }

    /// Row `row` as `(column, value)` pairs.
    pub fn record(&self, row: usize) -> Option<impl Iterator<Item = (&str, &Cell)>> {
        let cells = self.rows.get(row)?;
        Some(self.columns.iter().map(String::as_str).zip(cells.iter()))
    }
}
