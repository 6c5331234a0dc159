//! Row enrichment loop.
//!
//! [`run`] walks the data rows of a validated sheet top to bottom, looks each
//! record up with a [`LookupSource`], writes the outcome into a freshly
//! appended `DOI` column and reports progress through a callback. The
//! cancellation token is checked before every row; a lookup that has already
//! started always finishes first.
//!
//! [`process_file`] wraps the loop with loading and saving.

mod pipeline;

pub use pipeline::{process_file, RunReport};

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::models::{Cell, LookupOutcome, RunSummary, Table};
use crate::sources::LookupSource;
use crate::spreadsheet::{self, SchemaError, SpreadsheetError, DOI_COLUMN};

/// Progress events emitted by the loop.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Progress {
    /// A lookup for row `index` (0-based) is about to start
    Querying {
        index: usize,
        total: usize,
        title: String,
    },
    /// Row `current` (1-based) has its outcome recorded
    Processed {
        current: usize,
        total: usize,
        title: String,
        outcome: LookupOutcome,
    },
}

/// Result of a loop that was not rejected up front
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Completed { table: Table, summary: RunSummary },
    Cancelled { processed: usize },
}

/// Errors that abort a whole run
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Spreadsheet(#[from] SpreadsheetError),

    #[error("Background task failed: {0}")]
    Task(String),
}

/// Enrich every data row of `table` with a DOI outcome.
///
/// Fails with [`SchemaError`] before any lookup when the required headers are
/// missing.
pub async fn run<F>(
    mut table: Table,
    source: &dyn LookupSource,
    mut progress: F,
    cancel: &CancellationToken,
) -> Result<RunOutcome, SchemaError>
where
    F: FnMut(Progress) + Send,
{
    let columns = spreadsheet::validate(&table)?;
    let total = table.row_count();
    let doi_col = table.push_column(DOI_COLUMN);

    tracing::info!("{} records to process using {}", total, source.name());

    let mut summary = RunSummary::new(total);
    for row in 0..total {
        if cancel.is_cancelled() {
            tracing::info!("Processing cancelled after {} of {} records", row, total);
            return Ok(RunOutcome::Cancelled { processed: row });
        }

        let record = columns.record(&table, row);
        let title = record.display_title();

        tracing::debug!("Querying: {}", title);
        progress(Progress::Querying {
            index: row,
            total,
            title: title.clone(),
        });

        let outcome = source.lookup(&record).await;
        table.set(row, doi_col, Cell::Text(outcome.to_string()));
        summary.record(&outcome);

        progress(Progress::Processed {
            current: row + 1,
            total,
            title,
            outcome,
        });
    }

    Ok(RunOutcome::Completed { table, summary })
}
