//! Terminal output for runs: status lines, a progress bar and the summary table.
//!
//! [`RunView`] consumes [`RunEvent`]s from the controller. On a terminal it
//! drives an `indicatif` bar; otherwise it prints one plain line per record.

use comfy_table::{presets, Attribute, Cell, Table};
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use std::io::IsTerminal;
use std::path::Path;
use std::time::Duration;

use crate::controller::RunEvent;
use crate::enrich::Progress;
use crate::models::{LookupOutcome, RunSummary};

/// Check if stdout is a terminal.
pub fn is_terminal() -> bool {
    std::io::stdout().is_terminal()
}

/// Status types for colored output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Error,
    Warning,
    Info,
    Search,
}

/// Status icons for different operations.
pub fn status_icon(status: Status) -> &'static str {
    match status {
        Status::Success => "✓",
        Status::Error => "✗",
        Status::Warning => "⚠",
        Status::Info => "ℹ",
        Status::Search => "🔍",
    }
}

/// Map a lookup outcome onto a status.
pub fn outcome_status(outcome: &LookupOutcome) -> Status {
    match outcome {
        LookupOutcome::Found(_) => Status::Success,
        LookupOutcome::NotFound => Status::Warning,
        LookupOutcome::Timeout | LookupOutcome::Error(_) => Status::Error,
    }
}

/// Colored icon for a status
pub fn styled_icon(status: Status) -> String {
    let icon = status_icon(status);
    match status {
        Status::Success => icon.green().bold().to_string(),
        Status::Error => icon.red().bold().to_string(),
        Status::Warning => icon.yellow().bold().to_string(),
        Status::Info => icon.cyan().bold().to_string(),
        Status::Search => icon.yellow().to_string(),
    }
}

/// Print a styled status message.
pub fn print_status(status: Status, msg: &str) {
    match status {
        Status::Error => eprintln!("{} {}", styled_icon(status), msg),
        _ => println!("{} {}", styled_icon(status), msg),
    }
}

/// One line per processed record, without colors
pub fn row_line(current: usize, total: usize, title: &str, outcome: &LookupOutcome) -> String {
    format!("[{}/{}] {}: {}", current, total, title, outcome)
}

/// Completion summary as a table
pub fn summary_table(summary: &RunSummary, output_path: &Path) -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL);
    table.set_header(vec!["Result", "Count"]);
    table.add_row(vec![
        Cell::new("DOI found").add_attribute(Attribute::Bold),
        Cell::new(summary.success),
    ]);
    table.add_row(vec![Cell::new("Not Found"), Cell::new(summary.not_found())]);
    table.add_row(vec![Cell::new("Errors"), Cell::new(summary.errors)]);
    table.add_row(vec![Cell::new("Total"), Cell::new(summary.total)]);
    table.add_row(vec![
        Cell::new("Output"),
        Cell::new(output_path.display().to_string()),
    ]);
    table
}

/// How a [`RunView`] renders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    /// Progress bar with per-record lines above it
    Interactive,
    /// One plain line per record
    Plain,
    /// Only failures are printed
    Quiet,
}

impl ViewMode {
    pub fn detect(quiet: bool) -> Self {
        if quiet {
            ViewMode::Quiet
        } else if is_terminal() {
            ViewMode::Interactive
        } else {
            ViewMode::Plain
        }
    }
}

/// Renders controller events for one run.
pub struct RunView {
    mode: ViewMode,
    bar: Option<ProgressBar>,
}

impl RunView {
    pub fn new(mode: ViewMode) -> Self {
        Self { mode, bar: None }
    }

    pub fn handle(&mut self, event: &RunEvent) {
        match event {
            RunEvent::Started { input, output } => {
                if self.mode != ViewMode::Quiet {
                    print_status(
                        Status::Info,
                        &format!("Processing {} -> {}", input.display(), output.display()),
                    );
                }
            }
            RunEvent::Progress(progress) => self.progress(progress),
            RunEvent::Completed {
                output_path,
                summary,
            } => {
                self.finish();
                if self.mode != ViewMode::Quiet {
                    print_status(Status::Success, "Processing complete");
                    println!("{}", summary_table(summary, output_path));
                }
            }
            RunEvent::Cancelled { processed } => {
                self.finish();
                if self.mode != ViewMode::Quiet {
                    print_status(
                        Status::Warning,
                        &format!("Cancelled after {} records, no output written", processed),
                    );
                }
            }
            RunEvent::Failed { message } => {
                self.finish();
                print_status(Status::Error, message);
            }
        }
    }

    fn progress(&mut self, progress: &Progress) {
        match (self.mode, progress) {
            (ViewMode::Interactive, Progress::Querying { total, title, .. }) => {
                let bar = self.bar.get_or_insert_with(|| progress_bar(*total as u64));
                bar.set_message(title.clone());
            }
            (
                ViewMode::Interactive,
                Progress::Processed {
                    current,
                    total,
                    title,
                    outcome,
                },
            ) => {
                let bar = self.bar.get_or_insert_with(|| progress_bar(*total as u64));
                bar.set_position(*current as u64);
                bar.println(format!(
                    "{} {}",
                    styled_icon(outcome_status(outcome)),
                    row_line(*current, *total, title, outcome)
                ));
            }
            (
                ViewMode::Plain,
                Progress::Processed {
                    current,
                    total,
                    title,
                    outcome,
                },
            ) => println!("{}", row_line(*current, *total, title, outcome)),
            _ => {}
        }
    }

    fn finish(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}

fn progress_bar(len: u64) -> ProgressBar {
    let pb = ProgressBar::new(len);
    if let Ok(style) =
        ProgressStyle::with_template("{spinner:.cyan} {bar:40.cyan/blue} {pos}/{len} {wide_msg}")
    {
        pb.set_style(style.progress_chars("█▓▒░ "));
    }
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Spinner shown while a single lookup is in flight.
pub struct Spinner {
    pb: ProgressBar,
}

impl Spinner {
    pub fn new(msg: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            pb.set_style(style.tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ "));
        }
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));

        Self { pb }
    }

    pub fn finish(&self) {
        self.pb.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_icon() {
        assert_eq!(status_icon(Status::Success), "✓");
        assert_eq!(status_icon(Status::Error), "✗");
        assert_eq!(status_icon(Status::Search), "🔍");
    }

    #[test]
    fn test_outcome_status() {
        assert_eq!(
            outcome_status(&LookupOutcome::Found("10.1/x".to_string())),
            Status::Success
        );
        assert_eq!(outcome_status(&LookupOutcome::NotFound), Status::Warning);
        assert_eq!(outcome_status(&LookupOutcome::Timeout), Status::Error);
        assert_eq!(outcome_status(&LookupOutcome::error("boom")), Status::Error);
    }

    #[test]
    fn test_row_line() {
        assert_eq!(
            row_line(3, 10, "Deep Learning", &LookupOutcome::Timeout),
            "[3/10] Deep Learning: Timeout"
        );
    }

    #[test]
    fn test_summary_table() {
        let summary = RunSummary {
            total: 5,
            success: 3,
            errors: 1,
        };
        let rendered = summary_table(&summary, Path::new("out/papers_with_doi.xlsx")).to_string();

        assert!(rendered.contains("DOI found"));
        assert!(rendered.contains("Not Found"));
        assert!(rendered.contains("papers_with_doi.xlsx"));
        assert!(rendered.contains('3'));
        assert!(rendered.contains('5'));
    }

    #[test]
    fn test_view_handles_full_event_sequence() {
        let mut view = RunView::new(ViewMode::Quiet);
        view.handle(&RunEvent::Progress(Progress::Processed {
            current: 1,
            total: 1,
            title: "A".to_string(),
            outcome: LookupOutcome::NotFound,
        }));
        view.handle(&RunEvent::Cancelled { processed: 1 });
        assert!(view.bar.is_none());
    }
}
