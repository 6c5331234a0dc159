//! Comma-separated values reading and writing.

use std::path::Path;

use super::SpreadsheetError;
use crate::models::{Cell, Table};

/// Name given to the single sheet of a CSV file
pub const CSV_SHEET_NAME: &str = "Sheet1";

pub(crate) fn read(path: &Path) -> Result<Table, SpreadsheetError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|e| SpreadsheetError::load(path, e))?;

    let mut grid: Vec<Vec<Cell>> = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| SpreadsheetError::load(path, e))?;
        grid.push(
            record
                .iter()
                .map(|field| {
                    if field.is_empty() {
                        Cell::Empty
                    } else {
                        Cell::Text(field.to_string())
                    }
                })
                .collect(),
        );
    }

    Ok(Table::from_grid(CSV_SHEET_NAME, grid))
}

pub(crate) fn write(path: &Path, table: &Table) -> Result<(), SpreadsheetError> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|e| SpreadsheetError::save(path, e))?;

    for row in table.grid() {
        writer
            .write_record(row.iter().map(Cell::as_text))
            .map_err(|e| SpreadsheetError::save(path, e))?;
    }

    writer.flush().map_err(|e| SpreadsheetError::save(path, e))
}
