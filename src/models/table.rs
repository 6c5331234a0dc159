//! In-memory sheet model shared by the spreadsheet readers and writers.

use serde::{Deserialize, Serialize};

/// A single cell value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum Cell {
    #[default]
    Empty,
    Text(String),
    Float(f64),
    Int(i64),
    Bool(bool),
    /// Excel date/time serial number
    DateTime(f64),
    /// Excel duration, in days
    Duration(f64),
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Text form of the cell. Whole floats drop their fractional part so a year
    /// stored as `2017.0` reads back as `2017`.
    pub fn as_text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Float(f) | Cell::DateTime(f) | Cell::Duration(f) => number_text(*f),
            Cell::Int(i) => i.to_string(),
            Cell::Bool(b) => b.to_string(),
        }
    }
}

fn number_text(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{}", f as i64)
    } else {
        f.to_string()
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

/// One sheet: a header row plus data rows.
///
/// Rows may be ragged; reads past the end of a row yield [`Cell::Empty`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub sheet_name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

static EMPTY_CELL: Cell = Cell::Empty;

impl Table {
    pub fn new(sheet_name: impl Into<String>, headers: Vec<String>) -> Self {
        Self {
            sheet_name: sheet_name.into(),
            headers,
            rows: Vec::new(),
        }
    }

    /// Build a table from a full grid whose first row is the header row.
    pub fn from_grid(sheet_name: impl Into<String>, grid: Vec<Vec<Cell>>) -> Self {
        let mut rows = grid.into_iter();
        let headers = rows
            .next()
            .map(|header| header.iter().map(Cell::as_text).collect())
            .unwrap_or_default();

        Self {
            sheet_name: sheet_name.into(),
            headers,
            rows: rows.collect(),
        }
    }

    pub fn push_row(&mut self, row: Vec<Cell>) {
        self.rows.push(row);
    }

    /// Number of data rows, header excluded
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Width of the sheet: the widest of the header and every data row
    pub fn width(&self) -> usize {
        self.rows
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(self.headers.len()))
            .max()
            .unwrap_or(0)
    }

    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY_CELL)
    }

    pub fn text(&self, row: usize, col: usize) -> String {
        self.cell(row, col).as_text()
    }

    /// Append a header after the last used column and return its index.
    pub fn push_column(&mut self, header: impl Into<String>) -> usize {
        let col = self.width();
        self.headers.resize(col, String::new());
        self.headers.push(header.into());
        col
    }

    /// Set a data cell, padding the row with empty cells as needed.
    pub fn set(&mut self, row: usize, col: usize, value: Cell) {
        if row >= self.rows.len() {
            self.rows.resize_with(row + 1, Vec::new);
        }
        let cells = &mut self.rows[row];
        if col >= cells.len() {
            cells.resize(col + 1, Cell::Empty);
        }
        cells[col] = value;
    }

    /// Index of the first header equal to `name`
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// All values of one column, one per data row
    pub fn column(&self, col: usize) -> Vec<String> {
        (0..self.rows.len()).map(|row| self.text(row, col)).collect()
    }

    /// Header row followed by data rows, as cells
    pub fn grid(&self) -> impl Iterator<Item = Vec<Cell>> + '_ {
        let header = self
            .headers
            .iter()
            .map(|h| {
                if h.is_empty() {
                    Cell::Empty
                } else {
                    Cell::Text(h.clone())
                }
            })
            .collect::<Vec<_>>();
        std::iter::once(header).chain(self.rows.iter().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::from_grid(
            "Sheet1",
            vec![
                vec!["Title".into(), "Journal".into(), "Year".into()],
                vec!["Paper A".into(), "Nature".into(), Cell::Float(2020.0)],
                vec!["Paper B".into()],
            ],
        )
    }

    #[test]
    fn test_from_grid() {
        let table = sample();
        assert_eq!(table.headers, vec!["Title", "Journal", "Year"]);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.text(0, 2), "2020");
        assert_eq!(table.text(1, 1), "");
        assert_eq!(table.text(5, 5), "");
    }

    #[test]
    fn test_cell_as_text() {
        assert_eq!(Cell::Float(2017.0).as_text(), "2017");
        assert_eq!(Cell::Float(1.5).as_text(), "1.5");
        assert_eq!(Cell::Int(42).as_text(), "42");
        assert_eq!(Cell::Bool(true).as_text(), "true");
        assert_eq!(Cell::DateTime(42898.0).as_text(), "42898");
        assert_eq!(Cell::Empty.as_text(), "");
        assert!(Cell::Text(String::new()).is_empty());
    }

    #[test]
    fn test_push_column_after_widest_row() {
        let mut table = sample();
        table.set(1, 4, Cell::from("extra"));

        let col = table.push_column("DOI");
        assert_eq!(col, 5);
        assert_eq!(table.headers.len(), 6);
        assert_eq!(table.headers[3], "");
        assert_eq!(table.headers[5], "DOI");
    }

    #[test]
    fn test_set_pads_ragged_rows() {
        let mut table = sample();
        let col = table.push_column("DOI");
        table.set(1, col, Cell::from("Not Found"));

        assert_eq!(table.rows[1].len(), 4);
        assert_eq!(table.cell(1, 1), &Cell::Empty);
        assert_eq!(table.column(col), vec!["".to_string(), "Not Found".to_string()]);
    }

    #[test]
    fn test_grid_round_trip_shape() {
        let table = sample();
        let grid: Vec<_> = table.grid().collect();
        assert_eq!(grid.len(), 3);
        assert_eq!(grid[0][0], Cell::from("Title"));
    }
}
