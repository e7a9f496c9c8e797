//! Observation capture and reporting
//!
//! This module provides:
//! - Thread-safe per-run observation traces
//! - Aggregation of many runs (lost updates, duplicates, dispatch delays)
//! - Text/JSON output

pub mod collector;
pub mod reporter;
pub mod trace;

pub use collector::{OutcomeCollector, OutcomeSummary};
pub use reporter::Reporter;
pub use trace::{Observation, ObservationTrace};
