//! Output schema derivation.
//!
//! Source files carry a date and a time column first, then the measured
//! channels, and end every line with a trailing delimiter. The output schema
//! is therefore:
//!
//! ```text
//! [leading[0], leading[1]] ++ headers[2 .. len-1] minus dropped_columns
//! ```

use crate::config::MergeConfig;
use crate::error::{TransformError, TransformResult};

/// One output column and where its values come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputColumn {
    /// Index into the source row
    pub source_index: usize,
    /// Name in the output sheet
    pub name: String,
}

/// Derive the output columns for a file with `headers`.
pub fn derive_columns(headers: &[String], config: &MergeConfig) -> TransformResult<Vec<OutputColumn>> {
    if headers.len() < 3 {
        return Err(TransformError::TooFewColumns { found: headers.len() });
    }

    let last = headers.len() - 1;
    let mut columns: Vec<OutputColumn> = config
        .leading_columns
        .iter()
        .enumerate()
        .map(|(i, name)| OutputColumn {
            source_index: i,
            name: name.clone(),
        })
        .collect();

    columns.extend(
        headers[2..last]
            .iter()
            .enumerate()
            .filter(|(_, name)| !config.dropped_columns.iter().any(|d| d == *name))
            .map(|(offset, name)| OutputColumn {
                source_index: offset + 2,
                name: name.clone(),
            }),
    );

    Ok(columns)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn names(columns: &[OutputColumn]) -> Vec<&str> {
        columns.iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn test_sensor_file_schema() {
        let config = MergeConfig::default();
        let columns =
            derive_columns(&headers(&["A", "B", "C", "D", "E", "QF", "unnamed"]), &config).unwrap();

        assert_eq!(names(&columns), vec!["Date", "Time", "C", "D", "E"]);
        assert_eq!(columns[2].source_index, 2);
        assert_eq!(columns[4].source_index, 4);
    }

    #[test]
    fn test_source_indices_skip_dropped_column() {
        let config = MergeConfig::default();
        let columns =
            derive_columns(&headers(&["Fecha", "Hora", "QF", "Temp", ""]), &config).unwrap();

        assert_eq!(names(&columns), vec!["Date", "Time", "Temp"]);
        assert_eq!(columns[2].source_index, 3);
    }

    #[test]
    fn test_missing_qf_is_fine() {
        let config = MergeConfig::default();
        let columns = derive_columns(&headers(&["a", "b", "c", "d"]), &config).unwrap();
        assert_eq!(names(&columns), vec!["Date", "Time", "c"]);
    }

    #[test]
    fn test_last_column_dropped_even_if_named() {
        let config = MergeConfig::default();
        let columns = derive_columns(&headers(&["a", "b", "c", "Pressure"]), &config).unwrap();
        assert!(!names(&columns).contains(&"Pressure"));
    }

    #[test]
    fn test_three_columns_minimum() {
        let config = MergeConfig::default();
        let columns = derive_columns(&headers(&["a", "b", ""]), &config).unwrap();
        assert_eq!(names(&columns), vec!["Date", "Time"]);

        let err = derive_columns(&headers(&["a", "b"]), &config).unwrap_err();
        assert!(matches!(err, TransformError::TooFewColumns { found: 2 }));
    }

    #[test]
    fn test_custom_leading_and_dropped() {
        let config = MergeConfig {
            leading_columns: ["Fecha".into(), "Hora".into()],
            dropped_columns: vec!["QF".into(), "Status".into()],
            ..MergeConfig::default()
        };
        let columns =
            derive_columns(&headers(&["a", "b", "Status", "QF", "T", ""]), &config).unwrap();
        assert_eq!(names(&columns), vec!["Fecha", "Hora", "T"]);
    }
}
