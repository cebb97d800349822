//! Merge configuration.
//!
//! Everything the merge needs to know about its inputs lives in
//! [`MergeConfig`] and is passed into [`crate::pipeline::merge_directory`]
//! explicitly. Sources are layered, later wins:
//!
//! 1. built-in defaults (`#` fields, `,` decimals, `QF` dropped)
//! 2. JSON file named by `SHEETMERGE_CONFIG`
//! 3. individual `SHEETMERGE_*` environment variables

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, ConfigResult};

pub const ENV_CONFIG: &str = "SHEETMERGE_CONFIG";
pub const ENV_DIR: &str = "SHEETMERGE_DIR";
pub const ENV_WORKBOOK_FRAGMENT: &str = "SHEETMERGE_WORKBOOK_FRAGMENT";
pub const ENV_INPUT_FRAGMENT: &str = "SHEETMERGE_INPUT_FRAGMENT";
pub const ENV_DELIMITER: &str = "SHEETMERGE_DELIMITER";
pub const ENV_DECIMAL: &str = "SHEETMERGE_DECIMAL";
pub const ENV_DROP_COLUMNS: &str = "SHEETMERGE_DROP_COLUMNS";

/// Settings for one merge run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MergeConfig {
    /// Directory holding the input files and the workbook
    pub directory: PathBuf,

    /// File name fragment identifying the workbook
    pub workbook_fragment: String,

    /// File name fragment an input file must contain (empty: any)
    pub input_fragment: String,

    /// Field delimiter of the input files
    pub delimiter: char,

    /// Decimal separator of numeric values
    pub decimal_separator: char,

    /// Names given to the first two source columns
    pub leading_columns: [String; 2],

    /// Source columns removed from every record set
    pub dropped_columns: Vec<String>,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            workbook_fragment: "xls".to_string(),
            input_fragment: String::new(),
            delimiter: '#',
            decimal_separator: ',',
            leading_columns: ["Date".to_string(), "Time".to_string()],
            dropped_columns: vec!["QF".to_string()],
        }
    }
}

impl MergeConfig {
    /// Defaults pointed at `directory`.
    pub fn for_dir(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            ..Self::default()
        }
    }

    /// Load a config from a JSON file. Missing keys keep their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: MergeConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from the process environment.
    ///
    /// Call `dotenvy::dotenv()` beforehand to pick up a `.env` file.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup (the environment in production).
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match lookup(ENV_CONFIG) {
            Some(path) if !path.trim().is_empty() => Self::from_file(path.trim())?,
            _ => Self::default(),
        };

        if let Some(dir) = lookup(ENV_DIR) {
            config.directory = PathBuf::from(dir);
        }
        if let Some(fragment) = lookup(ENV_WORKBOOK_FRAGMENT) {
            config.workbook_fragment = fragment;
        }
        if let Some(fragment) = lookup(ENV_INPUT_FRAGMENT) {
            config.input_fragment = fragment;
        }
        if let Some(value) = lookup(ENV_DELIMITER) {
            config.delimiter = single_char(ENV_DELIMITER, &value)?;
        }
        if let Some(value) = lookup(ENV_DECIMAL) {
            config.decimal_separator = single_char(ENV_DECIMAL, &value)?;
        }
        if let Some(value) = lookup(ENV_DROP_COLUMNS) {
            config.dropped_columns = value
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject settings that cannot produce a sensible merge.
    pub fn validate(&self) -> ConfigResult<()> {
        if !self.delimiter.is_ascii() {
            return Err(ConfigError::invalid("delimiter", "must be a single ASCII character"));
        }
        if self.delimiter == self.decimal_separator {
            return Err(ConfigError::invalid(
                "decimalSeparator",
                "must differ from the field delimiter",
            ));
        }
        if self.workbook_fragment.is_empty() {
            return Err(ConfigError::invalid("workbookFragment", "must not be empty"));
        }
        if self.leading_columns.iter().any(|c| c.trim().is_empty()) {
            return Err(ConfigError::invalid("leadingColumns", "names must not be empty"));
        }
        Ok(())
    }
}

fn single_char(key: &str, value: &str) -> ConfigResult<char> {
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(ConfigError::invalid(key, format!("expected one character, got '{}'", value))),
    }
}
