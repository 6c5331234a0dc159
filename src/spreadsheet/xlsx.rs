//! Excel workbook reading (calamine) and writing (rust_xlsxwriter).

use calamine::{open_workbook, Data, Range, Reader, Xlsx};
use rust_xlsxwriter::{Format, Workbook as XlsxWorkbook, XlsxError};
use std::path::Path;

use super::SpreadsheetError;
use crate::models::{Cell, Table};

// Source number formats are not kept; date cells get one of these on write
const DATE_FORMAT: &str = "yyyy-mm-dd";
const DATETIME_FORMAT: &str = "yyyy-mm-dd hh:mm:ss";
const DURATION_FORMAT: &str = "[h]:mm:ss";

/// Read every worksheet of an `.xlsx` file, in workbook order.
pub(crate) fn read(path: &Path) -> Result<Vec<Table>, SpreadsheetError> {
    let mut workbook: Xlsx<_> =
        open_workbook(path).map_err(|e| SpreadsheetError::load(path, e))?;
    let sheet_names = workbook.sheet_names().to_owned();

    let mut tables = Vec::with_capacity(sheet_names.len());
    for sheet_name in sheet_names {
        let range = workbook
            .worksheet_range(&sheet_name)
            .map_err(|e| SpreadsheetError::load(path, format!("sheet '{}': {}", sheet_name, e)))?;

        tables.push(Table::from_grid(sheet_name, range_to_grid(&range)));
    }

    Ok(tables)
}

/// Lay a calamine range out on an absolute grid starting at A1, so the header
/// is always the sheet's first row even when leading rows or columns are blank.
fn range_to_grid(range: &Range<Data>) -> Vec<Vec<Cell>> {
    let (Some((row_offset, col_offset)), Some((last_row, last_col))) = (range.start(), range.end())
    else {
        return Vec::new();
    };

    let width = last_col as usize + 1;
    let mut grid = vec![vec![Cell::Empty; width]; last_row as usize + 1];

    for (row, col, data) in range.cells() {
        grid[row_offset as usize + row][col_offset as usize + col] = to_cell(data);
    }

    grid
}

fn to_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Float(f) => Cell::Float(*f),
        Data::Int(i) => Cell::Int(*i),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(d) if d.is_duration() => Cell::Duration(d.as_f64()),
        Data::DateTime(d) => Cell::DateTime(d.as_f64()),
        other => Cell::Text(other.to_string()),
    }
}

/// Write all sheets to a fresh `.xlsx` file, replacing any existing file.
pub(crate) fn write(path: &Path, sheets: &[Table]) -> Result<(), SpreadsheetError> {
    let mut out = XlsxWorkbook::new();
    let date_format = Format::new().set_num_format(DATE_FORMAT);
    let datetime_format = Format::new().set_num_format(DATETIME_FORMAT);
    let duration_format = Format::new().set_num_format(DURATION_FORMAT);

    for table in sheets {
        let worksheet = out.add_worksheet();
        if !table.sheet_name.is_empty() {
            worksheet
                .set_name(&table.sheet_name)
                .map_err(|e| SpreadsheetError::save(path, xlsx_err(e)))?;
        }

        for (row, cells) in table.grid().enumerate() {
            let row = u32::try_from(row)
                .map_err(|_| SpreadsheetError::save(path, "too many rows for xlsx"))?;

            for (col, cell) in cells.iter().enumerate() {
                let col = u16::try_from(col)
                    .map_err(|_| SpreadsheetError::save(path, "too many columns for xlsx"))?;

                let written = match cell {
                    Cell::Empty => continue,
                    Cell::Text(s) => worksheet.write_string(row, col, s.as_str()),
                    Cell::Float(f) => worksheet.write_number(row, col, *f),
                    Cell::Int(i) => worksheet.write_number(row, col, *i as f64),
                    Cell::Bool(b) => worksheet.write_boolean(row, col, *b),
                    Cell::DateTime(v) if v.fract() == 0.0 => {
                        worksheet.write_number_with_format(row, col, *v, &date_format)
                    }
                    Cell::DateTime(v) => {
                        worksheet.write_number_with_format(row, col, *v, &datetime_format)
                    }
                    Cell::Duration(v) => {
                        worksheet.write_number_with_format(row, col, *v, &duration_format)
                    }
                };
                written.map_err(|e| SpreadsheetError::save(path, xlsx_err(e)))?;
            }
        }
    }

    let bytes = out
        .save_to_buffer()
        .map_err(|e| SpreadsheetError::save(path, xlsx_err(e)))?;

    std::fs::write(path, bytes).map_err(|e| SpreadsheetError::save(path, e))
}

fn xlsx_err(err: XlsxError) -> String {
    err.to_string()
}
