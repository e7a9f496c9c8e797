//! Error types for racebench

use std::io;
use thiserror::Error;

/// Top-level harness error
///
/// Any of these aborts the run. No counter value or trace from a failed run
/// is reported as final.
#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Pool exhausted: {0}")]
    PoolExhausted(String),

    #[error("Join timed out after {timeout_ms}ms with {pending} task(s) still pending")]
    JoinTimeout { timeout_ms: u64, pending: usize },

    #[error("{failed} task(s) panicked before completing")]
    TaskFailed { failed: usize },

    #[error("Incomplete trace: expected {expected} observations, recorded {recorded}")]
    IncompleteTrace { expected: usize, recorded: usize },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, HarnessError>;
