//! File-level pipeline: load, enrich, save.

use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

use super::{run, Progress, RunError, RunOutcome};
use crate::models::RunSummary;
use crate::sources::LookupSource;
use crate::spreadsheet::{self, Workbook};

/// How a file-level run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunReport {
    Completed {
        output_path: PathBuf,
        summary: RunSummary,
    },
    Cancelled {
        processed: usize,
    },
}

/// Enrich `input` and write the result next to it as `<name>_with_doi.<ext>`.
///
/// Nothing is written unless every row was processed: schema errors, load
/// errors and cancellation all leave the file system untouched.
pub async fn process_file<F>(
    input: &Path,
    source: &dyn LookupSource,
    progress: F,
    cancel: &CancellationToken,
) -> Result<RunReport, RunError>
where
    F: FnMut(Progress) + Send,
{
    let output_path = spreadsheet::output_path(input);

    tracing::info!("Reading file {}", input.display());
    let mut workbook = load_blocking(input.to_path_buf()).await?;

    let table = workbook.take_primary();
    match run(table, source, progress, cancel).await? {
        RunOutcome::Completed { table, summary } => {
            workbook.replace_primary(table);

            tracing::info!("Saving file {}", output_path.display());
            save_blocking(workbook, output_path.clone()).await?;

            tracing::info!(
                "Processing complete: {} found, {} not found, {} errors",
                summary.success,
                summary.not_found(),
                summary.errors
            );
            Ok(RunReport::Completed {
                output_path,
                summary,
            })
        }
        RunOutcome::Cancelled { processed } => Ok(RunReport::Cancelled { processed }),
    }
}

async fn load_blocking(path: PathBuf) -> Result<Workbook, RunError> {
    tokio::task::spawn_blocking(move || spreadsheet::load(&path))
        .await
        .map_err(|e| RunError::Task(e.to_string()))?
        .map_err(RunError::from)
}

async fn save_blocking(workbook: Workbook, path: PathBuf) -> Result<(), RunError> {
    tokio::task::spawn_blocking(move || spreadsheet::save(&workbook, &path))
        .await
        .map_err(|e| RunError::Task(e.to_string()))?
        .map_err(RunError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LookupOutcome;
    use crate::sources::MockSource;
    use crate::spreadsheet::SpreadsheetError;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_process_csv_file() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("refs.csv");
        std::fs::write(
            &input,
            "Title,Journal,Year,Notes\n\
             Attention Is All You Need,NeurIPS,2017,keep me\n\
             Unknown,,,\n",
        )
        .unwrap();

        let source = MockSource::new();
        source.set_response(
            "Attention Is All You Need",
            LookupOutcome::Found("10.xxxx/example".to_string()),
        );

        let report = process_file(&input, &source, |_| {}, &CancellationToken::new())
            .await
            .unwrap();

        let expected_path = dir.path().join("refs_with_doi.csv");
        assert_eq!(
            report,
            RunReport::Completed {
                output_path: expected_path.clone(),
                summary: RunSummary {
                    total: 2,
                    success: 1,
                    errors: 0
                },
            }
        );
        assert_eq!(
            std::fs::read_to_string(&expected_path).unwrap(),
            "Title,Journal,Year,Notes,DOI\n\
             Attention Is All You Need,NeurIPS,2017,keep me,10.xxxx/example\n\
             Unknown,,,,Not Found\n"
        );
    }

    #[tokio::test]
    async fn test_schema_error_writes_nothing() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("bad.csv");
        std::fs::write(&input, "Name,Venue\nA,B\n").unwrap();

        let source = MockSource::new();
        let err = process_file(&input, &source, |_| {}, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, RunError::Schema(_)));
        assert!(!dir.path().join("bad_with_doi.csv").exists());
        assert_eq!(source.call_count(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_run_writes_nothing() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("refs.csv");
        std::fs::write(&input, "Title,Journal,Year\nA,,\nB,,\nC,,\n").unwrap();

        let source = MockSource::new();
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let report = process_file(
            &input,
            &source,
            move |p| {
                if matches!(p, Progress::Processed { current: 1, .. }) {
                    token.cancel();
                }
            },
            &cancel,
        )
        .await
        .unwrap();

        assert_eq!(report, RunReport::Cancelled { processed: 1 });
        assert_eq!(source.call_count(), 1);
        assert!(!dir.path().join("refs_with_doi.csv").exists());
    }

    #[tokio::test]
    async fn test_unwritable_output_is_save_error() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("refs.csv");
        std::fs::write(&input, "Title,Journal,Year\nA,J,2001\n").unwrap();
        // A directory squatting on the output path makes the write fail
        std::fs::create_dir(dir.path().join("refs_with_doi.csv")).unwrap();

        let source = MockSource::new();
        let err = process_file(&input, &source, |_| {}, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            RunError::Spreadsheet(SpreadsheetError::Save { .. })
        ));
        assert_eq!(source.call_count(), 1);
    }

    #[tokio::test]
    async fn test_missing_input_is_load_error() {
        let dir = tempdir().unwrap();
        let source = MockSource::new();

        let err = process_file(
            &dir.path().join("absent.xlsx"),
            &source,
            |_| {},
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            RunError::Spreadsheet(SpreadsheetError::Load { .. })
        ));
    }
}
