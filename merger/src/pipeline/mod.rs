//! Merge pipeline: directory → record sets → workbook sheets.
//!
//! # Example
//!
//! ```rust,ignore
//! use sheetmerge::{merge_directory, MergeConfig};
//!
//! let report = merge_directory(&MergeConfig::for_dir("/data/exports"))?;
//! println!("Appended {} sheets", report.sheets.len());
//! ```
//!
//! Name collisions are settled before anything is written: the sheet index
//! is checked for the file name ignoring case, as spreadsheet applications
//! compare sheet names, then for its exact lower-cased form. Parse and
//! I/O failures are reported as such and stop the run; the workbook on disk
//! is only replaced after every input was appended.

pub mod discover;

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::config::MergeConfig;
use crate::error::{MergeError, MergeResult, SourceError};
use crate::logs::{
    log_error, log_info, log_info_indent, log_success, log_success_indent, log_warning,
};
use crate::models::RecordSet;
use crate::parser::parse_file;
use crate::transform::build_record_set;
use crate::workbook::{output_path, Workbook};

pub use discover::{discover, file_name, Discovery};

/// Outcome of appending one input file
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetOutcome {
    /// Source file name
    pub file: String,
    /// Sheet the records landed on
    pub sheet: String,
    /// Whether the lower-cased fallback name was used
    pub renamed: bool,
    pub rows: usize,
    pub columns: usize,
}

/// Summary of a merge run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeReport {
    pub started_at: DateTime<Utc>,
    /// Workbook that was read
    pub workbook: PathBuf,
    /// Workbook that was written (None when nothing was appended)
    pub output: Option<PathBuf>,
    /// Sheets present before the merge
    pub existing_sheets: usize,
    /// Appended sheets in processing order
    pub sheets: Vec<SheetOutcome>,
}

impl MergeReport {
    fn new(workbook: PathBuf, existing_sheets: usize) -> Self {
        Self {
            started_at: Utc::now(),
            workbook,
            output: None,
            existing_sheets,
            sheets: Vec::new(),
        }
    }

    /// Files that were stored under their lower-cased name
    pub fn renamed_files(&self) -> Vec<&str> {
        self.sheets
            .iter()
            .filter(|s| s.renamed)
            .map(|s| s.file.as_str())
            .collect()
    }
}

/// Read one input file into a normalized record set.
pub fn read_record_set(path: &Path, config: &MergeConfig) -> MergeResult<RecordSet> {
    let name = file_name(path);
    let result: Result<RecordSet, SourceError> = parse_file(path, config.delimiter)
        .map_err(SourceError::from)
        .and_then(|raw| build_record_set(name.clone(), &raw, config).map_err(SourceError::from));
    result.map_err(|e| MergeError::source_file(name, e))
}

/// Append `records` under `file`, or under `file.to_lowercase()` when a
/// sheet of that name exists ignoring case. A second collision is an error.
pub fn append_with_fallback(
    workbook: &mut Workbook,
    file: &str,
    records: &RecordSet,
) -> MergeResult<SheetOutcome> {
    let (sheet, renamed) = if !workbook.contains_ignore_case(file) {
        (file.to_string(), false)
    } else {
        let fallback = file.to_lowercase();
        log_warning(format!("Sheet {} already exists, copying it as {}", file, fallback));
        if workbook.contains(&fallback) {
            return Err(MergeError::SheetNameTaken {
                file: file.to_string(),
                fallback,
            });
        }
        (fallback, true)
    };

    workbook.append_record_set(&sheet, records)?;

    Ok(SheetOutcome {
        file: file.to_string(),
        sheet,
        renamed,
        rows: records.row_count(),
        columns: records.column_count(),
    })
}

/// Append every input file to an in-memory workbook, in order.
pub fn merge_into(
    workbook: &mut Workbook,
    inputs: &[PathBuf],
    config: &MergeConfig,
) -> MergeResult<Vec<SheetOutcome>> {
    let mut outcomes = Vec::with_capacity(inputs.len());

    for path in inputs {
        let file = file_name(path);
        log_info(format!("📄 Copying {}", file));

        let records = read_record_set(path, config).inspect_err(|e| log_error(e.to_string()))?;
        log_info_indent(
            format!("{} rows, columns: {}", records.row_count(), records.columns.join(", ")),
            1,
        );
        if let Some(first) = records.record(0) {
            let preview: Vec<String> = first
                .map(|(column, value)| format!("{}={}", column, value))
                .collect();
            log_info_indent(format!("first row: {}", preview.join(", ")), 2);
        }

        let outcome = append_with_fallback(workbook, &file, &records)
            .inspect_err(|e| log_error(e.to_string()))?;
        log_success_indent(format!("Copied {} to sheet {}", file, outcome.sheet), 1);
        outcomes.push(outcome);
    }

    Ok(outcomes)
}

/// Merge every input file of `config.directory` into its workbook.
pub fn merge_directory(config: &MergeConfig) -> MergeResult<MergeReport> {
    config.validate()?;

    log_info(format!("📂 Reading {}", config.directory.display()));
    let found = discover(config)?;
    log_success(format!("Workbook: {}", file_name(&found.workbook)));
    log_success(format!("{} input file(s)", found.inputs.len()));

    let mut workbook = Workbook::open(&found.workbook)?;
    let mut report = MergeReport::new(found.workbook.clone(), workbook.len());

    report.sheets = merge_into(&mut workbook, &found.inputs, config)?;

    if report.sheets.is_empty() {
        log_info("Nothing to append, workbook left untouched");
        return Ok(report);
    }

    let output = output_path(&found.workbook);
    if output != found.workbook {
        log_warning(format!(
            "{} cannot be rewritten in its own format, saving as {}",
            file_name(&found.workbook),
            file_name(&output)
        ));
    }

    log_info(format!("💾 Saving {}", output.display()));
    workbook.save(&output)?;
    log_success(format!("{} sheet(s) appended", report.sheets.len()));

    report.output = Some(output);
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ParseError, WorkbookError};
    use crate::models::Cell;
    use std::fs;

    const SENSOR: &str = "Fecha#Hora#Temp#Hum#QF#\n\
                          01.02.2023#12:00:00#21,5#40#0#\n\
                          01.02.2023#12:10:00#21,7#41#0#\n";

    fn records(name: &str) -> RecordSet {
        let mut set = RecordSet::new(name, vec!["Date".into(), "Time".into()]);
        set.push_row(vec!["01.02.2023".into(), "12:00".into()]);
        set
    }

    fn fixture_workbook(path: &Path, sheets: &[&str]) {
        let mut book = rust_xlsxwriter::Workbook::new();
        for name in sheets {
            let sheet = book.add_worksheet();
            sheet.set_name(*name).unwrap();
            sheet.write_string(0, 0, "keep").unwrap();
        }
        book.save(path).unwrap();
    }

    #[test]
    fn test_fallback_on_same_name() {
        let mut workbook = Workbook::new();

        let first = append_with_fallback(&mut workbook, "DATA", &records("DATA")).unwrap();
        let second = append_with_fallback(&mut workbook, "DATA", &records("DATA")).unwrap();

        assert_eq!(first.sheet, "DATA");
        assert!(!first.renamed);
        assert_eq!(second.sheet, "data");
        assert!(second.renamed);
        assert_eq!(workbook.sheet_names(), vec!["DATA", "data"]);
    }

    #[test]
    fn test_fallback_when_name_differs_only_by_case() {
        let mut workbook = Workbook::new();
        append_with_fallback(&mut workbook, "DATA", &records("DATA")).unwrap();

        let outcome = append_with_fallback(&mut workbook, "Data", &records("Data")).unwrap();

        assert_eq!(outcome.sheet, "data");
        assert!(outcome.renamed);
        assert_eq!(workbook.sheet_names(), vec!["DATA", "data"]);
    }

    #[test]
    fn test_second_collision_is_error() {
        let mut workbook = Workbook::new();
        append_with_fallback(&mut workbook, "DATA", &records("DATA")).unwrap();
        append_with_fallback(&mut workbook, "DATA", &records("DATA")).unwrap();

        let err = append_with_fallback(&mut workbook, "DATA", &records("DATA")).unwrap_err();
        assert!(matches!(err, MergeError::SheetNameTaken { ref fallback, .. } if fallback == "data"));
        assert_eq!(workbook.len(), 2);
    }

    #[test]
    fn test_lowercase_name_already_lowercase() {
        let mut workbook = Workbook::new();
        append_with_fallback(&mut workbook, "data", &records("data")).unwrap();

        let err = append_with_fallback(&mut workbook, "data", &records("data")).unwrap_err();
        assert!(matches!(err, MergeError::SheetNameTaken { .. }));
    }

    #[test]
    fn test_invalid_name_is_not_renamed() {
        let mut workbook = Workbook::new();
        let name = "X".repeat(40);

        let err = append_with_fallback(&mut workbook, &name, &records("X")).unwrap_err();
        assert!(matches!(
            err,
            MergeError::Workbook(WorkbookError::InvalidSheetName { .. })
        ));
        assert!(workbook.is_empty());
    }

    #[test]
    fn test_read_record_set_error_names_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("EMPTY");
        fs::write(&path, "").unwrap();

        let err = read_record_set(&path, &MergeConfig::default()).unwrap_err();
        match err {
            MergeError::Source { file, source } => {
                assert_eq!(file, "EMPTY");
                assert!(matches!(source, SourceError::Parse(ParseError::EmptyFile)));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_merge_directory_appends_one_sheet_per_file() {
        let dir = tempfile::tempdir().unwrap();
        let book = dir.path().join("Resumen.xlsx");
        fixture_workbook(&book, &["Existing"]);
        fs::write(dir.path().join("SENSOR1"), SENSOR).unwrap();
        fs::write(dir.path().join("SENSOR2"), SENSOR).unwrap();

        let report = merge_directory(&MergeConfig::for_dir(dir.path())).unwrap();

        assert_eq!(report.existing_sheets, 1);
        assert_eq!(report.sheets.len(), 2);
        assert!(report.renamed_files().is_empty());
        assert_eq!(report.output.as_deref(), Some(book.as_path()));

        let merged = Workbook::open(&book).unwrap();
        assert_eq!(merged.sheet_names(), vec!["Existing", "SENSOR1", "SENSOR2"]);

        let existing = merged.sheet("Existing").unwrap();
        assert_eq!(existing.get_cell(0, 0), Some(&Cell::Text("keep".into())));

        let sensor = merged.sheet("SENSOR1").unwrap();
        let header: Vec<_> = (0..4).filter_map(|c| sensor.get_cell(0, c)).collect();
        assert_eq!(
            header,
            vec![
                &Cell::Text("Date".into()),
                &Cell::Text("Time".into()),
                &Cell::Text("Temp".into()),
                &Cell::Text("Hum".into()),
            ]
        );
        assert_eq!(sensor.get_cell(0, 4), None);
        assert_eq!(sensor.get_cell(1, 2), Some(&Cell::Number(21.5)));
        assert_eq!(sensor.get_cell(2, 3), Some(&Cell::Number(41.0)));
    }

    #[test]
    fn test_merge_directory_renames_on_existing_sheet() {
        let dir = tempfile::tempdir().unwrap();
        let book = dir.path().join("Resumen.xlsx");
        fixture_workbook(&book, &["SENSOR1"]);
        fs::write(dir.path().join("SENSOR1"), SENSOR).unwrap();

        let report = merge_directory(&MergeConfig::for_dir(dir.path())).unwrap();

        assert_eq!(report.sheets[0].sheet, "sensor1");
        assert_eq!(report.renamed_files(), vec!["SENSOR1"]);

        let merged = Workbook::open(&book).unwrap();
        assert_eq!(merged.sheet_names(), vec!["SENSOR1", "sensor1"]);
        assert_eq!(
            merged.sheet("SENSOR1").unwrap().get_cell(0, 0),
            Some(&Cell::Text("keep".into()))
        );
        assert_eq!(
            merged.sheet("sensor1").unwrap().get_cell(1, 2),
            Some(&Cell::Number(21.5))
        );
    }

    #[test]
    fn test_merge_directory_names_differing_only_by_case() {
        let dir = tempfile::tempdir().unwrap();
        let book = dir.path().join("Resumen.xlsx");
        fixture_workbook(&book, &["Existing"]);
        fs::write(dir.path().join("DATA"), SENSOR).unwrap();
        fs::write(dir.path().join("Data"), SENSOR.replace("21,5", "30,0")).unwrap();

        let report = merge_directory(&MergeConfig::for_dir(dir.path())).unwrap();

        let sheets: Vec<_> = report.sheets.iter().map(|s| s.sheet.as_str()).collect();
        assert_eq!(sheets, vec!["DATA", "data"]);
        assert_eq!(report.renamed_files(), vec!["Data"]);

        let merged = Workbook::open(&book).unwrap();
        assert_eq!(merged.sheet_names(), vec!["Existing", "DATA", "data"]);
        assert_eq!(
            merged.sheet("DATA").unwrap().get_cell(1, 2),
            Some(&Cell::Number(21.5))
        );
        assert_eq!(
            merged.sheet("data").unwrap().get_cell(1, 2),
            Some(&Cell::Number(30.0))
        );
    }

    #[test]
    fn test_merge_directory_keeps_existing_formulas() {
        use calamine::{open_workbook_auto, Reader};

        let dir = tempfile::tempdir().unwrap();
        let book = dir.path().join("Resumen.xlsx");
        let mut fixture = rust_xlsxwriter::Workbook::new();
        let calc = fixture.add_worksheet();
        calc.set_name("Calc").unwrap();
        calc.write_number(0, 0, 2.0).unwrap();
        calc.write_formula(0, 1, "=A1*2").unwrap();
        fixture.save(&book).unwrap();
        fs::write(dir.path().join("SENSOR1"), SENSOR).unwrap();

        merge_directory(&MergeConfig::for_dir(dir.path())).unwrap();

        let mut merged = open_workbook_auto(&book).unwrap();
        assert_eq!(merged.sheet_names(), vec!["Calc", "SENSOR1"]);
        let formulas = merged.worksheet_formula("Calc").unwrap();
        let texts: Vec<&str> = formulas
            .cells()
            .map(|(_, _, f)| f.as_str())
            .filter(|f| !f.is_empty())
            .collect();
        assert_eq!(texts, vec!["A1*2"]);
    }

    #[test]
    fn test_malformed_file_leaves_workbook_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let book = dir.path().join("Resumen.xlsx");
        fixture_workbook(&book, &["Existing"]);
        let before = fs::read(&book).unwrap();

        fs::write(dir.path().join("A_GOOD"), SENSOR).unwrap();
        fs::write(dir.path().join("B_BAD"), "only#two\n1#2\n").unwrap();

        let err = merge_directory(&MergeConfig::for_dir(dir.path())).unwrap_err();

        assert!(matches!(err, MergeError::Source { ref file, .. } if file == "B_BAD"));
        assert_eq!(fs::read(&book).unwrap(), before);
    }

    #[test]
    fn test_no_inputs_skips_save() {
        let dir = tempfile::tempdir().unwrap();
        let book = dir.path().join("Resumen.xlsx");
        fixture_workbook(&book, &["Existing"]);
        let before = fs::read(&book).unwrap();

        let report = merge_directory(&MergeConfig::for_dir(dir.path())).unwrap();

        assert!(report.sheets.is_empty());
        assert!(report.output.is_none());
        assert_eq!(fs::read(&book).unwrap(), before);
    }

    #[test]
    fn test_report_serializes() {
        let mut report = MergeReport::new(PathBuf::from("Resumen.xlsx"), 0);
        report.sheets.push(SheetOutcome {
            file: "DATA".into(),
            sheet: "data".into(),
            renamed: true,
            rows: 1,
            columns: 2,
        });

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["sheets"][0]["renamed"], true);
        assert_eq!(json["existingSheets"], 0);
        assert_eq!(report.renamed_files(), vec!["DATA"]);
    }
}
