//! Observation trace - what each worker saw before incrementing
//!
//! Appends are the one synchronization point workers share besides the
//! counter itself. The lock only guards the record list, never the counter.

use std::collections::BTreeMap;

use parking_lot::Mutex;
use serde::Serialize;

/// A single worker's pre-increment observation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Observation {
    /// Submission index of the task (0-based)
    pub worker_id: usize,
    /// Counter value the worker read before incrementing
    pub value: u64,
    /// Time between submission and the task body starting (microseconds)
    pub dispatch_delay_us: u64,
}

/// Thread-safe, append-only trace in completion order
#[derive(Debug, Default)]
pub struct ObservationTrace {
    entries: Mutex<Vec<Observation>>,
}

impl ObservationTrace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-size for the expected number of workers
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(Vec::with_capacity(capacity)),
        }
    }

    /// Append one observation (safe for concurrent callers)
    #[inline]
    pub fn record(&self, observation: Observation) {
        self.entries.lock().push(observation);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Copy of the entries recorded so far
    pub fn snapshot(&self) -> Vec<Observation> {
        self.entries.lock().clone()
    }

    /// Consume the trace, yielding entries in completion order
    pub fn into_observations(self) -> Vec<Observation> {
        self.entries.into_inner()
    }
}

/// Observed values in completion order
pub fn observed_values(observations: &[Observation]) -> Vec<u64> {
    observations.iter().map(|o| o.value).collect()
}

/// Number of observations that repeat a value some earlier worker already saw
pub fn duplicate_count(observations: &[Observation]) -> usize {
    let mut counts: BTreeMap<u64, usize> = BTreeMap::new();
    for o in observations {
        *counts.entry(o.value).or_insert(0) += 1;
    }
    counts.values().map(|c| c - 1).sum()
}

/// True when the sorted observed values are exactly `0..observations.len()`
pub fn is_permutation_of_range(observations: &[Observation]) -> bool {
    let mut values = observed_values(observations);
    values.sort_unstable();
    values
        .iter()
        .enumerate()
        .all(|(i, &v)| v == i as u64)
}
