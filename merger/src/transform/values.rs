//! Value typing.
//!
//! A column is numeric when every non-empty value in it parses with the
//! configured decimal separator; otherwise the whole column stays text.
//! Typing per column keeps codes such as `007` in a text column intact.

use crate::config::MergeConfig;
use crate::error::TransformResult;
use crate::models::{Cell, RecordSet};
use crate::parser::RawTable;

use super::schema::derive_columns;

/// Parse `value` as a number written with `decimal_separator`.
///
/// With a `,` separator a `.` is rejected: in these exports it only shows up
/// in dates and thousands marks.
pub fn parse_number(value: &str, decimal_separator: char) -> Option<f64> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    let normalized = if decimal_separator == '.' {
        value.to_string()
    } else {
        if value.contains('.') {
            return None;
        }
        value.replace(decimal_separator, ".")
    };

    let allowed = normalized
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'));
    if !allowed || !normalized.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    normalized.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Normalize a parsed file into a record set.
pub fn build_record_set(
    name: impl Into<String>,
    raw: &RawTable,
    config: &MergeConfig,
) -> TransformResult<RecordSet> {
    let columns = derive_columns(&raw.headers, config)?;
    let decimal = config.decimal_separator;

    let numeric: Vec<bool> = columns
        .iter()
        .map(|column| {
            raw.rows
                .iter()
                .filter_map(|row| row.get(column.source_index))
                .filter(|v| !v.is_empty())
                .all(|v| parse_number(v, decimal).is_some())
        })
        .collect();

    let mut set = RecordSet::new(name, columns.iter().map(|c| c.name.clone()).collect());

    for row in &raw.rows {
        let cells = columns
            .iter()
            .zip(&numeric)
            .map(|(column, &is_numeric)| {
                let value = row.get(column.source_index).map(String::as_str).unwrap_or("");
                to_cell(value, is_numeric, decimal)
            })
            .collect();
        set.push_row(cells);
    }

    Ok(set)
}

fn to_cell(value: &str, numeric: bool, decimal: char) -> Cell {
    if value.is_empty() {
        return Cell::Empty;
    }
    if numeric {
        if let Some(n) = parse_number(value, decimal) {
            return Cell::Number(n);
        }
    }
    Cell::Text(value.to_string())
}
