//! Bibliographic record and lookup outcome models.

use serde::{Deserialize, Serialize};

/// Maximum number of characters of a failure description kept in an `Error` outcome
pub const ERROR_MESSAGE_LIMIT: usize = 50;

/// Maximum number of title characters shown in progress messages
pub const DISPLAY_TITLE_LIMIT: usize = 40;

/// One input row: the (title, journal, year) triple describing a publication.
///
/// Absent cells are represented by empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub title: String,
    pub journal: String,
    pub year: String,
}

impl Record {
    pub fn new(
        title: impl Into<String>,
        journal: impl Into<String>,
        year: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            journal: journal.into(),
            year: year.into(),
        }
    }

    /// Free-text bibliographic query: title, journal and year joined by single spaces.
    ///
    /// The parts are not escaped or trimmed.
    pub fn bibliographic_query(&self) -> String {
        format!("{} {} {}", self.title, self.journal, self.year)
    }

    /// Title as shown in progress messages.
    ///
    /// Titles longer than [`DISPLAY_TITLE_LIMIT`] characters are cut to that many
    /// characters followed by `...`.
    pub fn display_title(&self) -> String {
        if self.title.chars().count() > DISPLAY_TITLE_LIMIT {
            let head: String = self.title.chars().take(DISPLAY_TITLE_LIMIT).collect();
            format!("{}...", head)
        } else {
            self.title.clone()
        }
    }
}

/// Result of a single lookup attempt.
///
/// The `Display` form is the exact text written to the output `DOI` column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum LookupOutcome {
    /// The first candidate's identifier
    Found(String),
    /// The service returned no candidates
    NotFound,
    /// The request exceeded the network timeout
    Timeout,
    /// Any other failure, message already truncated
    Error(String),
}

impl LookupOutcome {
    /// Build an `Error` outcome keeping the first [`ERROR_MESSAGE_LIMIT`] characters.
    pub fn error(description: impl AsRef<str>) -> Self {
        LookupOutcome::Error(
            description
                .as_ref()
                .chars()
                .take(ERROR_MESSAGE_LIMIT)
                .collect(),
        )
    }

    pub fn is_success(&self) -> bool {
        matches!(self, LookupOutcome::Found(_))
    }

    /// Timeouts and errors both count as failures in the run summary
    pub fn is_error(&self) -> bool {
        matches!(self, LookupOutcome::Timeout | LookupOutcome::Error(_))
    }
}

impl std::fmt::Display for LookupOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LookupOutcome::Found(doi) => write!(f, "{}", doi),
            LookupOutcome::NotFound => write!(f, "Not Found"),
            LookupOutcome::Timeout => write!(f, "Timeout"),
            LookupOutcome::Error(message) => write!(f, "Error: {}", message),
        }
    }
}

/// Outcome counters for a completed run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total: usize,
    pub success: usize,
    pub errors: usize,
}

impl RunSummary {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    /// Count one outcome. `NotFound` only shows up in [`RunSummary::not_found`].
    pub fn record(&mut self, outcome: &LookupOutcome) {
        if outcome.is_success() {
            self.success += 1;
        } else if outcome.is_error() {
            self.errors += 1;
        }
    }

    pub fn not_found(&self) -> usize {
        self.total.saturating_sub(self.success + self.errors)
    }
}
