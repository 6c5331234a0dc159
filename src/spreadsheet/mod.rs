//! Spreadsheet loading, saving and output path derivation.
//!
//! Supported formats are picked from the file extension:
//!
//! - `.xlsx`: every worksheet is read; the first one is the sheet that gets
//!   enriched, the others are written back unchanged
//! - `.csv`: a single sheet
//!
//! Saving always creates the target file fresh, replacing whatever was there.

mod delimited;
pub mod schema;
mod xlsx;

pub use schema::{validate, ColumnMap, SchemaError, REQUIRED_COLUMNS};

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::models::Table;

/// Suffix appended to the input file stem to name the output file
pub const OUTPUT_SUFFIX: &str = "_with_doi";

/// Header of the column appended to the enriched sheet
pub const DOI_COLUMN: &str = "DOI";

/// On-disk spreadsheet format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpreadsheetFormat {
    Xlsx,
    Csv,
}

impl SpreadsheetFormat {
    /// Detect the format from the file extension (case-insensitive)
    pub fn from_path(path: &Path) -> Result<Self, SpreadsheetError> {
        let extension = path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_ascii_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "xlsx" => Ok(SpreadsheetFormat::Xlsx),
            "csv" => Ok(SpreadsheetFormat::Csv),
            _ => Err(SpreadsheetError::UnsupportedFormat { extension }),
        }
    }
}

/// A loaded spreadsheet file
#[derive(Debug, Clone, PartialEq)]
pub struct Workbook {
    pub format: SpreadsheetFormat,
    pub sheets: Vec<Table>,
}

impl Workbook {
    /// The sheet that gets enriched
    pub fn primary(&self) -> &Table {
        &self.sheets[0]
    }

    /// Move the primary sheet out, leaving an empty placeholder
    pub fn take_primary(&mut self) -> Table {
        std::mem::take(&mut self.sheets[0])
    }

    pub fn replace_primary(&mut self, table: Table) {
        self.sheets[0] = table;
    }
}

/// Load a spreadsheet. The result always has at least one sheet.
pub fn load(path: &Path) -> Result<Workbook, SpreadsheetError> {
    if !path.is_file() {
        return Err(SpreadsheetError::load(path, "file does not exist"));
    }

    let format = SpreadsheetFormat::from_path(path)?;
    let sheets = match format {
        SpreadsheetFormat::Xlsx => xlsx::read(path)?,
        SpreadsheetFormat::Csv => vec![delimited::read(path)?],
    };

    if sheets.is_empty() {
        return Err(SpreadsheetError::load(path, "workbook has no sheets"));
    }

    tracing::debug!(
        "Loaded {} sheet(s) from {}, primary sheet '{}' has {} data rows",
        sheets.len(),
        path.display(),
        sheets[0].sheet_name,
        sheets[0].row_count()
    );

    Ok(Workbook { format, sheets })
}

/// Write a workbook to `path` in its own format, replacing any existing file.
pub fn save(workbook: &Workbook, path: &Path) -> Result<(), SpreadsheetError> {
    match workbook.format {
        SpreadsheetFormat::Xlsx => xlsx::write(path, &workbook.sheets),
        SpreadsheetFormat::Csv => match workbook.sheets.first() {
            Some(table) => delimited::write(path, table),
            None => Err(SpreadsheetError::save(path, "workbook has no sheets")),
        },
    }
}

/// `dir/name.ext` becomes `dir/name_with_doi.ext`.
pub fn output_path(input: &Path) -> PathBuf {
    let mut name: OsString = input.file_stem().map(|s| s.to_os_string()).unwrap_or_default();
    name.push(OUTPUT_SUFFIX);
    if let Some(extension) = input.extension() {
        name.push(".");
        name.push(extension);
    }
    input.with_file_name(name)
}

/// Spreadsheet I/O errors
#[derive(Debug, thiserror::Error)]
pub enum SpreadsheetError {
    #[error("Failed to load {}: {message}", path.display())]
    Load { path: PathBuf, message: String },

    #[error("Failed to save {}: {message}", path.display())]
    Save { path: PathBuf, message: String },

    #[error("Unsupported spreadsheet format '{extension}' (expected .xlsx or .csv)")]
    UnsupportedFormat { extension: String },
}

impl SpreadsheetError {
    pub(crate) fn load(path: &Path, err: impl std::fmt::Display) -> Self {
        SpreadsheetError::Load {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }

    pub(crate) fn save(path: &Path, err: impl std::fmt::Display) -> Self {
        SpreadsheetError::Save {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }
}
