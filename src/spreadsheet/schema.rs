//! Header validation for the enriched sheet.

use crate::models::{Record, Table};

/// Headers every input sheet must carry, matched exactly and case-sensitively
pub const REQUIRED_COLUMNS: [&str; 3] = ["Title", "Journal", "Year"];

/// Column indices of the required fields in a validated table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMap {
    pub title: usize,
    pub journal: usize,
    pub year: usize,
}

impl ColumnMap {
    /// Read the three fields of one data row. Missing cells become empty strings.
    pub fn record(&self, table: &Table, row: usize) -> Record {
        Record {
            title: table.text(row, self.title),
            journal: table.text(row, self.journal),
            year: table.text(row, self.year),
        }
    }
}

/// The header row does not contain the required columns
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error(
        "Spreadsheet must contain Title, Journal and Year columns \
         (missing: {}; found headers: {:?})",
        missing.join(", "),
        found
    )]
    MissingColumns {
        missing: Vec<String>,
        found: Vec<String>,
    },
}

/// Resolve the required columns of `table`.
///
/// Any structural problem with the header row is reported as
/// [`SchemaError::MissingColumns`]. When a required header appears more than
/// once, the leftmost occurrence is used.
pub fn validate(table: &Table) -> Result<ColumnMap, SchemaError> {
    let mut indices = [0usize; 3];
    let mut missing = Vec::new();

    for (slot, name) in REQUIRED_COLUMNS.iter().enumerate() {
        match table.column_index(name) {
            Some(index) => {
                let occurrences = table.headers.iter().filter(|h| h == name).count();
                if occurrences > 1 {
                    tracing::warn!(
                        "Header '{}' appears {} times; using column {}",
                        name,
                        occurrences,
                        index + 1
                    );
                }
                indices[slot] = index;
            }
            None => missing.push(name.to_string()),
        }
    }

    if !missing.is_empty() {
        return Err(SchemaError::MissingColumns {
            missing,
            found: table.headers.clone(),
        });
    }

    Ok(ColumnMap {
        title: indices[0],
        journal: indices[1],
        year: indices[2],
    })
}
