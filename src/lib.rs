//! # DOI Finder
//!
//! Fills a `DOI` column in a spreadsheet of papers by querying the CrossRef
//! works API once per row.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`models`]: Core data structures (Record, LookupOutcome, Table, etc.)
//! - [`sources`]: Lookup backends behind the [`LookupSource`] trait
//! - [`spreadsheet`]: Reading, validating and writing `.xlsx` / `.csv` files
//! - [`enrich`]: The row enrichment loop and the file-level pipeline
//! - [`controller`]: Background run lifecycle, cancellation and events
//! - [`ui`]: Terminal rendering of run events
//! - [`utils`]: HTTP client
//! - [`config`]: Configuration management

pub mod config;
pub mod controller;
pub mod enrich;
pub mod models;
pub mod sources;
pub mod spreadsheet;
pub mod ui;
pub mod utils;

// Re-export commonly used types
pub use controller::{RunController, RunEvent, RunState};
pub use models::{LookupOutcome, Record, RunSummary};
pub use sources::{CrossRefSource, LookupSource};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
