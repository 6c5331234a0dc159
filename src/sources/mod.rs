//! Metadata lookup sources.
//!
//! This module defines the [`LookupSource`] trait used by the enrichment loop to
//! resolve a bibliographic record to a DOI. [`CrossRefSource`] talks to the
//! CrossRef REST API; [`MockSource`] returns scripted outcomes for tests.
//!
//! A source never fails as a whole: every failure mode is folded into a
//! [`LookupOutcome`] so the loop can record it and move on to the next row.

mod crossref;
pub mod mock;

pub use crossref::CrossRefSource;
pub use mock::MockSource;

use crate::models::{LookupOutcome, Record};
use async_trait::async_trait;

/// Interface implemented by every lookup backend.
///
/// One call issues at most one outbound request. Implementations must not retry.
#[async_trait]
pub trait LookupSource: Send + Sync + std::fmt::Debug {
    /// Unique identifier for this source (e.g. "crossref")
    fn id(&self) -> &str;

    /// Human-readable name of this source
    fn name(&self) -> &str;

    /// Resolve one record to an outcome
    async fn lookup(&self, record: &Record) -> LookupOutcome;
}

/// Errors raised while talking to a source, before they are folded into an outcome
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The request exceeded the configured timeout
    #[error("request timed out")]
    Timeout,

    /// Transport or HTTP status failure
    #[error("{0}")]
    Network(String),

    /// Response body could not be understood
    #[error("invalid response: {0}")]
    Parse(String),

    /// The source could not be constructed or the request could not be built
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SourceError::Timeout
        } else if err.is_decode() {
            SourceError::Parse(err.to_string())
        } else {
            SourceError::Network(err.to_string())
        }
    }
}

impl From<SourceError> for LookupOutcome {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::Timeout => LookupOutcome::Timeout,
            other => LookupOutcome::error(other.to_string()),
        }
    }
}
