//! In-memory workbook.
//!
//! `xlsx` files cannot be appended to in place, so the merge loads every
//! existing sheet with calamine, appends new sheets in memory and writes the
//! whole workbook back once with rust_xlsxwriter. Existing sheets keep their
//! order, cell values and formulas; styling is not carried over.

mod package;

use calamine::{open_workbook_auto, Data, Reader};
use rust_xlsxwriter::{Format, Formula, Workbook as XlsxWorkbook, Worksheet};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{WorkbookError, WorkbookResult};
use crate::models::{Cell, RecordSet};

/// Longest sheet name spreadsheet applications accept
pub const MAX_SHEET_NAME_LEN: usize = 31;

/// Rows per worksheet
pub const MAX_ROWS: usize = 1_048_576;

/// Columns per worksheet
pub const MAX_COLUMNS: usize = 16_384;

const FORBIDDEN_CHARS: [char; 7] = ['[', ']', ':', '*', '?', '/', '\\'];

/// Suffix of the sibling file a save writes before renaming
pub const TEMP_SUFFIX: &str = ".sheetmerge.tmp";

const DATETIME_FORMAT: &str = "yyyy-mm-dd hh:mm:ss";

const PLACEHOLDER_PREFIX: &str = "sheetmerge~";

// =============================================================================
// Sheet
// =============================================================================

/// A named sheet with a sparse cell grid.
///
/// Formulas are kept next to the cells; the cell then holds the cached
/// result.
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub name: String,
    cells: BTreeMap<(u32, u16), Cell>,
    formulas: BTreeMap<(u32, u16), String>,
}

impl Sheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cells: BTreeMap::new(),
            formulas: BTreeMap::new(),
        }
    }

    pub fn set_cell(&mut self, row: u32, col: u16, cell: Cell) {
        if cell.is_empty() {
            self.cells.remove(&(row, col));
        } else {
            self.cells.insert((row, col), cell);
        }
    }

    pub fn get_cell(&self, row: u32, col: u16) -> Option<&Cell> {
        self.cells.get(&(row, col))
    }

    /// Store a formula, with or without its leading `=`.
    pub fn set_formula(&mut self, row: u32, col: u16, formula: impl Into<String>) {
        let formula = formula.into();
        let formula = formula.trim().trim_start_matches('=');
        if formula.is_empty() {
            self.formulas.remove(&(row, col));
        } else {
            self.formulas.insert((row, col), formula.to_string());
        }
    }

    /// Formula text without the leading `=`
    pub fn formula(&self, row: u32, col: u16) -> Option<&str> {
        self.formulas.get(&(row, col)).map(String::as_str)
    }

    /// Non-empty cells in row-major order
    pub fn cells_iter(&self) -> impl Iterator<Item = ((u32, u16), &Cell)> {
        self.cells.iter().map(|(pos, cell)| (*pos, cell))
    }

    /// Number of rows up to the last non-empty one
    pub fn row_count(&self) -> u32 {
        self.cells
            .keys()
            .chain(self.formulas.keys())
            .map(|(row, _)| row + 1)
            .max()
            .unwrap_or(0)
    }

    /// Header row followed by one row per record.
    fn from_record_set(name: &str, records: &RecordSet) -> Self {
        let mut sheet = Sheet::new(name);

        for (col, column) in records.columns.iter().enumerate() {
            sheet.set_cell(0, col as u16, Cell::Text(column.clone()));
        }
        for (row, cells) in records.rows().iter().enumerate() {
            for (col, cell) in cells.iter().enumerate() {
                sheet.set_cell(row as u32 + 1, col as u16, cell.clone());
            }
        }

        sheet
    }
}

// =============================================================================
// Sheet Names
// =============================================================================

/// Check `name` against spreadsheet sheet-naming rules.
pub fn validate_sheet_name(name: &str) -> WorkbookResult<()> {
    let invalid = |reason| {
        Err(WorkbookError::InvalidSheetName {
            name: name.to_string(),
            reason,
        })
    };

    if name.trim().is_empty() {
        return invalid("name is empty");
    }
    if name.chars().count() > MAX_SHEET_NAME_LEN {
        return invalid("longer than 31 characters");
    }
    if name.contains(FORBIDDEN_CHARS) {
        return invalid("contains one of [ ] : * ? / \\");
    }
    if name.starts_with('\'') || name.ends_with('\'') {
        return invalid("starts or ends with an apostrophe");
    }
    Ok(())
}

// =============================================================================
// Workbook
// =============================================================================

/// Ordered collection of uniquely named sheets.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Workbook {
    sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every sheet of an existing workbook file.
    pub fn open(path: impl AsRef<Path>) -> WorkbookResult<Self> {
        let path = path.as_ref();
        let open_err = |message: String| WorkbookError::Open {
            path: path.to_path_buf(),
            message,
        };

        let mut source = open_workbook_auto(path).map_err(|e| open_err(e.to_string()))?;
        let sheet_names = source.sheet_names().to_owned();

        let mut workbook = Workbook::new();
        for sheet_name in sheet_names {
            let range = source
                .worksheet_range(&sheet_name)
                .map_err(|e| open_err(format!("sheet '{}': {}", sheet_name, e)))?;

            let mut sheet = Sheet::new(sheet_name.clone());
            let (row_offset, col_offset) = range.start().unwrap_or((0, 0));

            for (row, col, data) in range.cells() {
                let cell = match data {
                    Data::Empty => continue,
                    Data::String(s) => Cell::Text(s.clone()),
                    Data::Float(f) => Cell::Number(*f),
                    Data::Int(i) => Cell::Number(*i as f64),
                    Data::Bool(b) => Cell::Bool(*b),
                    Data::DateTime(dt) => Cell::DateTime(dt.as_f64()),
                    Data::Error(e) => Cell::Text(e.to_string()),
                    other => Cell::Text(other.to_string()),
                };
                sheet.set_cell(
                    row_offset + row as u32,
                    (col_offset as usize + col) as u16,
                    cell,
                );
            }

            // Sheets without formula support (or chart sheets) keep values only.
            if let Ok(formulas) = source.worksheet_formula(&sheet_name) {
                let (row_offset, col_offset) = formulas.start().unwrap_or((0, 0));
                for (row, col, formula) in formulas.cells() {
                    sheet.set_formula(
                        row_offset + row as u32,
                        (col_offset as usize + col) as u16,
                        formula.as_str(),
                    );
                }
            }

            workbook.sheets.push(sheet);
        }

        Ok(workbook)
    }

    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    /// Exact, case-sensitive lookup in the sheet index.
    pub fn contains(&self, name: &str) -> bool {
        self.sheets.iter().any(|s| s.name == name)
    }

    /// Lookup the way spreadsheet applications compare sheet names.
    pub fn contains_ignore_case(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        self.sheets.iter().any(|s| s.name.to_lowercase() == name)
    }

    pub fn len(&self) -> usize {
        self.sheets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }

    /// Append `records` as a new sheet called `name`.
    ///
    /// Fails with [`WorkbookError::SheetExists`] instead of replacing an
    /// existing sheet; callers check [`Workbook::contains`] first.
    pub fn append_record_set(&mut self, name: &str, records: &RecordSet) -> WorkbookResult<&Sheet> {
        validate_sheet_name(name)?;
        if self.contains(name) {
            return Err(WorkbookError::SheetExists(name.to_string()));
        }

        let rows = records.row_count() + 1;
        let columns = records.column_count();
        if rows > MAX_ROWS || columns > MAX_COLUMNS {
            return Err(WorkbookError::TooLarge {
                name: name.to_string(),
                rows,
                columns,
            });
        }

        self.sheets.push(Sheet::from_record_set(name, records));
        let index = self.sheets.len() - 1;
        Ok(&self.sheets[index])
    }

    /// Serialize to `xlsx` bytes.
    ///
    /// A sheet whose name repeats an earlier one ignoring case is written
    /// under a placeholder and renamed in the package afterwards.
    pub fn to_bytes(&self) -> WorkbookResult<Vec<u8>> {
        let mut out = XlsxWorkbook::new();
        let datetime = Format::new().set_num_format(DATETIME_FORMAT);

        let mut taken: HashSet<String> =
            self.sheets.iter().map(|s| s.name.to_lowercase()).collect();
        let mut written: HashSet<String> = HashSet::new();
        let mut renames: Vec<(String, String)> = Vec::new();

        for sheet in &self.sheets {
            let name = if written.insert(sheet.name.to_lowercase()) {
                sheet.name.clone()
            } else {
                let placeholder = placeholder_name(&mut taken);
                renames.push((placeholder.clone(), sheet.name.clone()));
                placeholder
            };

            let worksheet = out.add_worksheet();
            worksheet.set_name(&name)?;
            write_cells(worksheet, sheet, &datetime)?;
        }

        package::restore_sheet_names(out.save_to_buffer()?, &renames)
    }

    /// Write the workbook to `path`.
    ///
    /// The bytes go to a sibling temp file first, then replace `path`, so a
    /// failed save never leaves a truncated workbook behind.
    pub fn save(&self, path: impl AsRef<Path>) -> WorkbookResult<()> {
        let path = path.as_ref();
        let bytes = self.to_bytes()?;

        let tmp = temp_path(path);
        fs::write(&tmp, &bytes)?;
        if let Err(e) = fs::rename(&tmp, path) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }
}

/// Where a merged copy of `workbook` is written.
///
/// Only `xlsx` is written back in place; `xls` and `xlsm` sources get an
/// `xlsx` sibling since their format (or macros) cannot be reproduced.
pub fn output_path(workbook: &Path) -> PathBuf {
    let is_xlsx = workbook
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("xlsx"));
    if is_xlsx {
        workbook.to_path_buf()
    } else {
        workbook.with_extension("xlsx")
    }
}

/// Unused name that no sheet matches ignoring case.
fn placeholder_name(taken: &mut HashSet<String>) -> String {
    let mut index = 1;
    loop {
        let candidate = format!("{}{}", PLACEHOLDER_PREFIX, index);
        if taken.insert(candidate.clone()) {
            return candidate;
        }
        index += 1;
    }
}

fn write_cells(worksheet: &mut Worksheet, sheet: &Sheet, datetime: &Format) -> WorkbookResult<()> {
    for (&(row, col), formula) in &sheet.formulas {
        let cached = sheet
            .get_cell(row, col)
            .map(|cell| cell.to_string())
            .unwrap_or_default();
        worksheet.write_formula(row, col, Formula::new(formula).set_result(cached))?;
    }

    for ((row, col), cell) in sheet.cells_iter() {
        if sheet.formulas.contains_key(&(row, col)) {
            continue;
        }
        match cell {
            Cell::Empty => {}
            Cell::Number(n) => {
                worksheet.write_number(row, col, *n)?;
            }
            Cell::Text(s) => {
                worksheet.write_string(row, col, s)?;
            }
            Cell::Bool(b) => {
                worksheet.write_boolean(row, col, *b)?;
            }
            Cell::DateTime(serial) => {
                worksheet.write_number_with_format(row, col, *serial, datetime)?;
            }
        }
    }
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(TEMP_SUFFIX);
    path.with_file_name(name)
}
