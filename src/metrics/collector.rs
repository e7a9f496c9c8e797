//! Outcome collector - aggregates many runs of the same experiment

use std::collections::HashSet;

use hdrhistogram::Histogram;

use crate::benchmark::orchestrator::{new_delay_histogram, RunOutcome};
use crate::benchmark::VisibilityMode;

/// Accumulates run outcomes into an [`OutcomeSummary`]
pub struct OutcomeCollector {
    mode: VisibilityMode,
    worker_count: usize,
    runs: u64,
    linearizable_runs: u64,
    lossy_runs: u64,
    total_duplicates: u64,
    min_final: u64,
    max_final: u64,
    sum_final: u64,
    distinct_traces: HashSet<Vec<u64>>,
    lost_updates: Histogram<u64>,
    dispatch_delays: Histogram<u64>,
}

impl OutcomeCollector {
    pub fn new(mode: VisibilityMode, worker_count: usize) -> Self {
        Self {
            mode,
            worker_count,
            runs: 0,
            linearizable_runs: 0,
            lossy_runs: 0,
            total_duplicates: 0,
            min_final: u64::MAX,
            max_final: 0,
            sum_final: 0,
            distinct_traces: HashSet::new(),
            lost_updates: Histogram::new(3).expect("Failed to create histogram"),
            dispatch_delays: new_delay_histogram(),
        }
    }

    /// Fold one run into the totals
    pub fn record(&mut self, outcome: &RunOutcome) {
        self.runs += 1;
        if outcome.is_linearizable() {
            self.linearizable_runs += 1;
        }

        let lost = outcome.lost_updates();
        if lost > 0 {
            self.lossy_runs += 1;
        }
        self.lost_updates.saturating_record(lost);
        self.total_duplicates += outcome.duplicate_observations() as u64;

        self.min_final = self.min_final.min(outcome.final_value);
        self.max_final = self.max_final.max(outcome.final_value);
        self.sum_final += outcome.final_value;

        self.distinct_traces.insert(outcome.observed_values());
        self.dispatch_delays.add(&outcome.dispatch_histogram).ok();
    }

    /// Snapshot of everything recorded so far
    pub fn summary(&self) -> OutcomeSummary {
        let mean_final = if self.runs == 0 {
            0.0
        } else {
            self.sum_final as f64 / self.runs as f64
        };

        OutcomeSummary {
            mode: self.mode,
            worker_count: self.worker_count,
            runs: self.runs,
            linearizable_runs: self.linearizable_runs,
            lossy_runs: self.lossy_runs,
            distinct_traces: self.distinct_traces.len() as u64,
            total_duplicates: self.total_duplicates,
            min_final: if self.runs == 0 { 0 } else { self.min_final },
            max_final: self.max_final,
            mean_final,
            max_lost_updates: self.lost_updates.max(),
            p50_lost_updates: self.lost_updates.value_at_percentile(50.0),
            p50_dispatch_us: self.dispatch_delays.value_at_percentile(50.0),
            p99_dispatch_us: self.dispatch_delays.value_at_percentile(99.0),
            max_dispatch_us: self.dispatch_delays.max(),
        }
    }
}

/// Aggregated view over every run of one configuration
#[derive(Debug, Clone)]
pub struct OutcomeSummary {
    pub mode: VisibilityMode,
    pub worker_count: usize,
    pub runs: u64,
    pub linearizable_runs: u64,
    pub lossy_runs: u64,
    pub distinct_traces: u64,
    pub total_duplicates: u64,
    pub min_final: u64,
    pub max_final: u64,
    pub mean_final: f64,
    pub max_lost_updates: u64,
    pub p50_lost_updates: u64,
    pub p50_dispatch_us: u64,
    pub p99_dispatch_us: u64,
    pub max_dispatch_us: u64,
}

impl OutcomeSummary {
    /// Build a summary over a finished set of runs
    pub fn from_outcomes(mode: VisibilityMode, worker_count: usize, outcomes: &[RunOutcome]) -> Self {
        let mut collector = OutcomeCollector::new(mode, worker_count);
        for outcome in outcomes {
            collector.record(outcome);
        }
        collector.summary()
    }

    /// Format as summary string
    pub fn summary(&self) -> String {
        format!(
            "Mode: {} | Workers: {} | Runs: {} | Linearizable: {} | Lossy: {} | Final min/mean/max: {}/{:.2}/{}",
            self.mode,
            self.worker_count,
            self.runs,
            self.linearizable_runs,
            self.lossy_runs,
            self.min_final,
            self.mean_final,
            self.max_final
        )
    }

    /// Convert to JSON object
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "mode": self.mode,
            "workers": self.worker_count,
            "runs": self.runs,
            "linearizable_runs": self.linearizable_runs,
            "lossy_runs": self.lossy_runs,
            "distinct_traces": self.distinct_traces,
            "total_duplicates": self.total_duplicates,
            "final_value": {
                "min": self.min_final,
                "mean": self.mean_final,
                "max": self.max_final
            },
            "lost_updates": {
                "p50": self.p50_lost_updates,
                "max": self.max_lost_updates
            },
            "dispatch_delay_us": {
                "p50": self.p50_dispatch_us,
                "p99": self.p99_dispatch_us,
                "max": self.max_dispatch_us
            }
        })
    }
}
