//! Race experiment execution
//!
//! This module provides the multi-threaded execution system:
//! - SharedCounter: the contended cell, with a selectable visibility mode
//! - WorkerPool: fixed thread pool that runs every submitted task to completion
//! - Orchestrator: runs the experiment and validates each run's trace

pub mod counters;
pub mod orchestrator;
pub mod worker;

pub use counters::{SharedCounter, VisibilityMode};
pub use orchestrator::{Orchestrator, RunOutcome};
pub use worker::WorkerPool;
