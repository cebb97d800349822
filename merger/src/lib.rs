//! # Sheetmerge - append delimited data files to a workbook
//!
//! Sheetmerge takes a directory of `#`-delimited measurement exports plus one
//! existing workbook, and appends every export to the workbook as its own
//! sheet.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Data File  │────▶│   Parser    │────▶│  Transform  │────▶│  Workbook   │
//! │  (#, 1,5)   │     │  (auto-enc) │     │ (schema+num)│     │ (one sheet) │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! Each record set gets the columns `Date`, `Time`, then the source columns
//! minus the trailing artifact column and `QF`. A sheet is named after its
//! file; when that name is taken it is appended under the lower-cased name.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sheetmerge::{merge_directory, MergeConfig};
//!
//! fn main() {
//!     let report = merge_directory(&MergeConfig::for_dir("exports")).unwrap();
//!     println!("Renamed: {:?}", report.renamed_files());
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`config`] - Merge settings from defaults, file and environment
//! - [`logs`] - Console progress log
//! - [`parser`] - Delimited text parsing with encoding detection
//! - [`models`] - Cells and record sets
//! - [`transform`] - Output schema and value typing
//! - [`workbook`] - Workbook loading, sheet index, saving
//! - [`pipeline`] - Directory discovery and the merge loop

// Core modules
pub mod config;
pub mod error;
pub mod logs;
pub mod models;

// Reading
pub mod parser;
pub mod transform;

// Writing
pub mod workbook;

// Orchestration
pub mod pipeline;

// =============================================================================
// Re-exports - Errors
// =============================================================================

pub use error::{
    ConfigError, MergeError, MergeResult, ParseError, SourceError, TransformError, WorkbookError,
};

// =============================================================================
// Re-exports - Config & Models
// =============================================================================

pub use config::MergeConfig;
pub use models::{Cell, RecordSet};

// =============================================================================
// Re-exports - Parsing & Transform
// =============================================================================

pub use parser::{decode_content, detect_encoding, parse_bytes, parse_file, parse_str, RawTable};
pub use transform::{build_record_set, derive_columns, parse_number, OutputColumn};

// =============================================================================
// Re-exports - Workbook
// =============================================================================

pub use workbook::{output_path, validate_sheet_name, Sheet, Workbook};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use pipeline::{
    append_with_fallback, discover, merge_directory, merge_into, read_record_set, Discovery,
    MergeReport, SheetOutcome,
};
