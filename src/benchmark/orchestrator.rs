//! Run orchestrator
//!
//! Builds one counter, one pool and one trace per run, submits the workers,
//! joins, and checks the trace before handing the outcome to the reporter.

use std::sync::Arc;
use std::time::{Duration, Instant};

use hdrhistogram::Histogram;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use super::counters::{SharedCounter, VisibilityMode};
use super::worker::WorkerPool;
use crate::config::HarnessConfig;
use crate::metrics::trace::{self, Observation, ObservationTrace};
use crate::utils::{HarnessError, Result};

/// Upper bound for dispatch delays (one minute, in microseconds)
const MAX_DISPATCH_DELAY_US: u64 = 60_000_000;

/// Histogram for dispatch delays in microseconds
pub(crate) fn new_delay_histogram() -> Histogram<u64> {
    Histogram::new_with_bounds(1, MAX_DISPATCH_DELAY_US, 3).expect("Failed to create histogram")
}

/// Result of one complete run
pub struct RunOutcome {
    /// 0-based index among the configured runs
    pub run_index: u32,
    pub mode: VisibilityMode,
    pub worker_count: usize,
    /// Observations in completion order
    pub observations: Vec<Observation>,
    /// Counter value after the pool drained
    pub final_value: u64,
    /// Wall time from first submission to join
    pub duration: Duration,
    /// Submission-to-start delays of every worker
    pub dispatch_histogram: Histogram<u64>,
}

impl RunOutcome {
    /// Observed values in completion order
    pub fn observed_values(&self) -> Vec<u64> {
        trace::observed_values(&self.observations)
    }

    /// Increments that vanished because another worker overwrote them
    pub fn lost_updates(&self) -> u64 {
        (self.worker_count as u64).saturating_sub(self.final_value)
    }

    /// Observations repeating a value another worker already saw
    pub fn duplicate_observations(&self) -> usize {
        trace::duplicate_count(&self.observations)
    }

    /// Final value is N and the observations are exactly {0, .., N-1}
    pub fn is_linearizable(&self) -> bool {
        self.final_value == self.worker_count as u64
            && trace::is_permutation_of_range(&self.observations)
    }
}

/// Run orchestrator
pub struct Orchestrator {
    config: Arc<HarnessConfig>,
}

impl Orchestrator {
    /// Create new orchestrator; configuration errors surface here
    pub fn new(config: HarnessConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
        })
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Run one experiment with a fresh counter
    pub fn run_once(&self, run_index: u32) -> Result<RunOutcome> {
        let counter = Arc::new(SharedCounter::new(self.config.visibility_mode));
        self.run_with_counter(run_index, counter)
    }

    /// Run one experiment against a caller-supplied counter
    pub(crate) fn run_with_counter(
        &self,
        run_index: u32,
        counter: Arc<SharedCounter>,
    ) -> Result<RunOutcome> {
        let worker_count = self.config.worker_count;
        let pool = WorkerPool::new(self.config.pool_capacity)?;
        let recorder = Arc::new(ObservationTrace::with_capacity(worker_count));

        let start_time = Instant::now();

        for worker_id in 0..worker_count {
            let counter = Arc::clone(&counter);
            let recorder = Arc::clone(&recorder);
            let submitted_at = Instant::now();

            pool.submit(move || {
                let dispatch_delay_us = submitted_at.elapsed().as_micros() as u64;
                counter.observe_and_increment(|value| {
                    recorder.record(Observation {
                        worker_id,
                        value,
                        dispatch_delay_us,
                    })
                });
            })?;
        }

        match self.config.join_timeout {
            Some(timeout) => pool.shutdown_and_join_timeout(timeout)?,
            None => pool.shutdown_and_join()?,
        }

        let duration = start_time.elapsed();

        let observations = recorder.snapshot();
        if observations.len() != worker_count {
            return Err(HarnessError::IncompleteTrace {
                expected: worker_count,
                recorded: observations.len(),
            });
        }

        let mut dispatch_histogram = new_delay_histogram();
        for o in &observations {
            dispatch_histogram.saturating_record(o.dispatch_delay_us);
        }

        let outcome = RunOutcome {
            run_index,
            mode: counter.mode(),
            worker_count,
            observations,
            final_value: counter.read(),
            duration,
            dispatch_histogram,
        };

        debug!(
            "Run {}: final={} lost={} duplicates={} ({:.3}ms)",
            run_index,
            outcome.final_value,
            outcome.lost_updates(),
            outcome.duplicate_observations(),
            duration.as_secs_f64() * 1000.0
        );

        Ok(outcome)
    }

    /// Run every configured repetition; the first failure aborts the whole set
    pub fn run_all(&self) -> Result<Vec<RunOutcome>> {
        let runs = self.config.runs;
        let progress = if runs > 1 && !self.config.quiet {
            Some(Self::progress_bar(runs))
        } else {
            None
        };

        let mut outcomes = Vec::with_capacity(runs as usize);
        for run_index in 0..runs {
            let outcome = self.run_once(run_index)?;
            outcomes.push(outcome);
            if let Some(ref pb) = progress {
                pb.inc(1);
            }
        }

        if let Some(pb) = progress {
            pb.finish_with_message("done");
        }

        let lossy = outcomes.iter().filter(|o| o.lost_updates() > 0).count();
        if !self.config.quiet {
            info!(
                "{} run(s) in {} mode, {} with lost updates",
                runs, self.config.visibility_mode, lossy
            );
        }

        Ok(outcomes)
    }

    fn progress_bar(runs: u32) -> ProgressBar {
        let pb = ProgressBar::new(runs as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({msg})")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;

    fn orchestrator(workers: usize, mode: VisibilityMode) -> Orchestrator {
        let mut config = HarnessConfig::new(workers, mode);
        config.quiet = true;
        Orchestrator::new(config).unwrap()
    }

    #[test]
    fn test_atomic_run_is_linearizable() {
        for workers in [1, 2, 5, 10, 64] {
            let outcome = orchestrator(workers, VisibilityMode::AtomicRmw)
                .run_once(0)
                .unwrap();

            assert_eq!(outcome.final_value, workers as u64);
            let mut values = outcome.observed_values();
            values.sort_unstable();
            assert_eq!(values, (0..workers as u64).collect::<Vec<_>>());
            assert!(outcome.is_linearizable());
            assert_eq!(outcome.lost_updates(), 0);
            assert_eq!(outcome.duplicate_observations(), 0);
        }
    }

    #[test]
    fn test_atomic_five_workers_permutation() {
        let outcome = orchestrator(5, VisibilityMode::AtomicRmw)
            .run_once(0)
            .unwrap();
        assert_eq!(outcome.final_value, 5);
        let mut values = outcome.observed_values();
        values.sort_unstable();
        assert_eq!(values, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_atomic_with_small_pool() {
        let mut config = HarnessConfig::new(50, VisibilityMode::AtomicRmw);
        config.pool_capacity = 3;
        let outcome = Orchestrator::new(config).unwrap().run_once(0).unwrap();
        assert!(outcome.is_linearizable());
    }

    #[test]
    fn test_racy_modes_never_fabricate_increments() {
        for mode in [VisibilityMode::None, VisibilityMode::VisibleOnly] {
            for _ in 0..20 {
                let outcome = orchestrator(16, mode).run_once(0).unwrap();
                assert_eq!(outcome.observations.len(), 16);
                assert!(outcome.final_value >= 1);
                assert!(outcome.final_value <= 16);
            }
        }
    }

    #[test]
    fn test_single_worker_is_deterministic_in_every_mode() {
        for mode in [
            VisibilityMode::None,
            VisibilityMode::VisibleOnly,
            VisibilityMode::AtomicRmw,
        ] {
            let first = orchestrator(1, mode).run_once(0).unwrap();
            let second = orchestrator(1, mode).run_once(0).unwrap();
            for outcome in [first, second] {
                assert_eq!(outcome.final_value, 1);
                assert_eq!(outcome.observed_values(), vec![0]);
                assert_eq!(outcome.observations[0].worker_id, 0);
            }
        }
    }

    #[test]
    fn test_zero_workers_rejected() {
        let config = HarnessConfig::new(0, VisibilityMode::AtomicRmw);
        assert!(matches!(
            Orchestrator::new(config),
            Err(HarnessError::Config(_))
        ));
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let mut config = HarnessConfig::new(4, VisibilityMode::None);
        config.pool_capacity = 0;
        assert!(matches!(
            Orchestrator::new(config),
            Err(HarnessError::Config(_))
        ));
    }

    #[test]
    fn test_forced_contention_collapses_to_one() {
        // All ten workers finish their read and their increment's load before
        // any store: every worker sees 0 and nine increments are lost
        for mode in [VisibilityMode::None, VisibilityMode::VisibleOnly] {
            let barrier = Arc::new(Barrier::new(10));
            let counter = Arc::new(SharedCounter::with_interleave_barrier(mode, barrier));

            let outcome = orchestrator(10, mode)
                .run_with_counter(0, counter)
                .unwrap();

            assert_eq!(outcome.final_value, 1);
            assert_eq!(outcome.observed_values(), vec![0; 10]);
            assert_eq!(outcome.lost_updates(), 9);
            assert_eq!(outcome.duplicate_observations(), 9);
            assert!(!outcome.is_linearizable());
        }
    }

    #[test]
    fn test_forced_contention_does_not_affect_atomic() {
        let barrier = Arc::new(Barrier::new(10));
        let counter = Arc::new(SharedCounter::with_interleave_barrier(
            VisibilityMode::AtomicRmw,
            barrier,
        ));

        let outcome = orchestrator(10, VisibilityMode::AtomicRmw)
            .run_with_counter(0, counter)
            .unwrap();
        assert!(outcome.is_linearizable());
    }

    #[test]
    fn test_trace_ids_cover_every_worker() {
        let outcome = orchestrator(20, VisibilityMode::None).run_once(0).unwrap();
        let mut ids: Vec<_> = outcome.observations.iter().map(|o| o.worker_id).collect();
        ids.sort_unstable();
        assert_eq!(ids, (0..20).collect::<Vec<_>>());
        assert_eq!(outcome.dispatch_histogram.len(), 20);
    }

    #[test]
    fn test_run_all_repeats() {
        let mut config = HarnessConfig::new(4, VisibilityMode::AtomicRmw);
        config.runs = 5;
        config.quiet = true;
        config.join_timeout = Some(Duration::from_secs(30));

        let outcomes = Orchestrator::new(config).unwrap().run_all().unwrap();
        assert_eq!(outcomes.len(), 5);
        for (i, outcome) in outcomes.iter().enumerate() {
            assert_eq!(outcome.run_index, i as u32);
            assert!(outcome.is_linearizable());
        }
    }
}
