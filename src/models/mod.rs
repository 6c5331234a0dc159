//! Core data models for bibliographic records, sheets and lookup results.

mod record;
mod table;

pub use record::{LookupOutcome, Record, RunSummary, DISPLAY_TITLE_LIMIT, ERROR_MESSAGE_LIMIT};
pub use table::{Cell, Table};
