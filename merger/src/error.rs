//! Error types for the sheet merger.
//!
//! One enum per layer:
//!
//! - [`ParseError`] - reading and splitting a delimited input file
//! - [`TransformError`] - deriving the output schema
//! - [`WorkbookError`] - opening, appending to and saving the workbook
//! - [`ConfigError`] - loading [`crate::config::MergeConfig`]
//! - [`MergeError`] - top-level merge orchestration
//!
//! Conversion is automatic via `From` implementations, so `?` works across
//! layer boundaries. A sheet-name collision is not an error at all: the merge
//! checks the sheet index first and only reports [`MergeError::SheetNameTaken`]
//! once the lower-cased fallback name is taken as well.

use std::path::PathBuf;
use thiserror::Error;

// =============================================================================
// Parse Errors
// =============================================================================

/// Errors while reading a delimited input file.
#[derive(Debug, Error)]
pub enum ParseError {
    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    /// Content could not be decoded.
    #[error("Failed to decode content as {encoding}")]
    Encoding { encoding: String },

    /// Malformed record.
    #[error("Line {line}: {message}")]
    Csv { line: u64, message: String },

    /// No header line.
    #[error("File is empty")]
    EmptyFile,
}

impl From<csv::Error> for ParseError {
    fn from(err: csv::Error) -> Self {
        let line = err.position().map(|p| p.line()).unwrap_or(0);
        ParseError::Csv {
            line,
            message: err.to_string(),
        }
    }
}

// =============================================================================
// Transform Errors
// =============================================================================

/// Errors while normalizing a parsed table into a record set.
#[derive(Debug, Error)]
pub enum TransformError {
    /// Two leading columns plus the trailing artifact column are required.
    #[error("Expected at least 3 columns, found {found}")]
    TooFewColumns { found: usize },
}

// =============================================================================
// Workbook Errors
// =============================================================================

/// Errors from the workbook layer.
#[derive(Debug, Error)]
pub enum WorkbookError {
    /// Existing workbook could not be read.
    #[error("Failed to open workbook {path}: {message}")]
    Open { path: PathBuf, message: String },

    /// Name rejected by spreadsheet naming rules.
    #[error("Invalid sheet name '{name}': {reason}")]
    InvalidSheetName { name: String, reason: &'static str },

    /// Record set exceeds the sheet grid.
    #[error("Sheet '{name}' needs {rows} rows x {columns} columns, more than a worksheet holds")]
    TooLarge { name: String, rows: usize, columns: usize },

    /// A sheet with exactly this name is already present.
    #[error("Sheet '{0}' already exists")]
    SheetExists(String),

    /// Serializing the workbook failed.
    #[error("Failed to write workbook: {0}")]
    Write(#[from] rust_xlsxwriter::XlsxError),

    /// Rewriting the sheet names in the saved package failed.
    #[error("Failed to rewrite workbook package: {0}")]
    Package(#[from] zip::result::ZipError),

    /// IO error while persisting.
    #[error("Workbook IO error: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Config Errors
// =============================================================================

/// Errors while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// Config file is not valid JSON.
    #[error("Invalid config file: {0}")]
    Json(#[from] serde_json::Error),

    /// A setting has an unusable value.
    #[error("Invalid value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

impl ConfigError {
    pub fn invalid(key: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            key: key.into(),
            message: message.into(),
        }
    }
}

// =============================================================================
// Merge Errors (top-level)
// =============================================================================

/// Top-level merge errors.
///
/// This is the error type returned by [`crate::pipeline::merge_directory`].
#[derive(Debug, Error)]
pub enum MergeError {
    /// Configuration error.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Workbook error.
    #[error("Workbook error: {0}")]
    Workbook(#[from] WorkbookError),

    /// An input file could not be turned into a record set.
    #[error("{file}: {source}")]
    Source {
        file: String,
        #[source]
        source: SourceError,
    },

    /// Directory listing failed.
    #[error("Failed to list {dir}: {source}")]
    ReadDir {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No file in the directory matches the workbook fragment.
    #[error("No workbook matching '{fragment}' found in {dir}")]
    WorkbookNotFound { dir: PathBuf, fragment: String },

    /// Both the file name and its lower-cased form are taken.
    #[error("Cannot append {file}: sheets '{file}' and '{fallback}' both exist")]
    SheetNameTaken { file: String, fallback: String },
}

/// Parse or transform failure of a single input file.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Transform(#[from] TransformError),
}

impl MergeError {
    pub fn source_file(file: impl Into<String>, source: impl Into<SourceError>) -> Self {
        MergeError::Source {
            file: file.into(),
            source: source.into(),
        }
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for parse operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Result type for transform operations.
pub type TransformResult<T> = Result<T, TransformError>;

/// Result type for workbook operations.
pub type WorkbookResult<T> = Result<T, WorkbookError>;

/// Result type for config operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for merge operations.
pub type MergeResult<T> = Result<T, MergeError>;
