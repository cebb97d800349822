//! Directory discovery.
//!
//! Finds the target workbook and the input files in the configured
//! directory. Entries are sorted by file name so runs are reproducible.
//!
//! An `xls`/`xlsm` workbook is merged into an `xlsx` sibling. Once that
//! sibling exists it is the workbook, so later runs build on earlier ones.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::MergeConfig;
use crate::error::{MergeError, MergeResult};
use crate::workbook::{output_path, TEMP_SUFFIX};

/// Files taking part in one merge
#[derive(Debug, Clone, PartialEq)]
pub struct Discovery {
    pub workbook: PathBuf,
    pub inputs: Vec<PathBuf>,
}

/// File name of `path` as a string.
pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn is_ignored(name: &str) -> bool {
    name.starts_with('.') || name.starts_with("~$") || name.ends_with(TEMP_SUFFIX)
}

/// List `config.directory` and classify its files.
pub fn discover(config: &MergeConfig) -> MergeResult<Discovery> {
    let dir = &config.directory;
    let read_err = |source| MergeError::ReadDir {
        dir: dir.clone(),
        source,
    };

    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(read_err)? {
        let entry = entry.map_err(read_err)?;
        let path = entry.path();
        if path.is_file() && !is_ignored(&file_name(&path)) {
            files.push(path);
        }
    }
    files.sort_by_key(|p| file_name(p));

    let source = files
        .iter()
        .find(|p| file_name(p).contains(&config.workbook_fragment))
        .cloned()
        .ok_or_else(|| MergeError::WorkbookNotFound {
            dir: dir.clone(),
            fragment: config.workbook_fragment.clone(),
        })?;

    let sibling = output_path(&source);
    let workbook = if files.contains(&sibling) {
        sibling.clone()
    } else {
        source.clone()
    };

    let inputs = files
        .into_iter()
        .filter(|p| *p != source && *p != sibling)
        .filter(|p| {
            let name = file_name(p);
            !name.contains(&config.workbook_fragment) && name.contains(&config.input_fragment)
        })
        .collect();

    Ok(Discovery { workbook, inputs })
}
