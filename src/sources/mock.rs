//! Mock source for testing purposes.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::models::{LookupOutcome, Record};
use crate::sources::LookupSource;

/// A mock source that returns predefined outcomes and remembers every query.
///
/// Outcomes are matched on the record title; unmatched titles get the default
/// outcome (`NotFound` unless changed).
#[derive(Debug)]
pub struct MockSource {
    responses: Mutex<HashMap<String, LookupOutcome>>,
    default_outcome: Mutex<LookupOutcome>,
    queries: Mutex<Vec<Record>>,
}

impl Default for MockSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSource {
    /// Create a new mock source.
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(HashMap::new()),
            default_outcome: Mutex::new(LookupOutcome::NotFound),
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Create a mock that answers every query with `outcome`.
    pub fn with_default(outcome: LookupOutcome) -> Self {
        let source = Self::new();
        source.set_default(outcome);
        source
    }

    /// Set the outcome returned for a given title.
    pub fn set_response(&self, title: &str, outcome: LookupOutcome) {
        lock(&self.responses).insert(title.to_string(), outcome);
    }

    /// Set the outcome returned for titles without a specific response.
    pub fn set_default(&self, outcome: LookupOutcome) {
        *lock(&self.default_outcome) = outcome;
    }

    /// Records seen so far, in call order.
    pub fn queries(&self) -> Vec<Record> {
        lock(&self.queries).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.queries).len()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl LookupSource for MockSource {
    fn id(&self) -> &str {
        "mock"
    }

    fn name(&self) -> &str {
        "Mock Source"
    }

    async fn lookup(&self, record: &Record) -> LookupOutcome {
        lock(&self.queries).push(record.clone());

        let scripted = lock(&self.responses).get(&record.title).cloned();
        match scripted {
            Some(outcome) => outcome,
            None => lock(&self.default_outcome).clone(),
        }
    }
}
