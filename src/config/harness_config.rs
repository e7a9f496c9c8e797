//! Harness configuration derived from CLI arguments

use std::time::Duration;

use super::cli::{CliArgs, OutputFormat};
use crate::benchmark::VisibilityMode;
use crate::utils::{HarnessError, Result};

/// Complete, validated harness configuration
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    // Experiment
    pub worker_count: usize,
    pub visibility_mode: VisibilityMode,
    pub pool_capacity: usize,
    pub runs: u32,
    pub join_timeout: Option<Duration>,

    // Output
    pub output_format: OutputFormat,
    pub quiet: bool,
    pub verbose: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            worker_count: 10,
            visibility_mode: VisibilityMode::None,
            pool_capacity: 10,
            runs: 1,
            join_timeout: None,
            output_format: OutputFormat::Text,
            quiet: false,
            verbose: false,
        }
    }
}

impl HarnessConfig {
    /// Create configuration from CLI arguments
    pub fn from_cli(args: &CliArgs) -> Result<Self> {
        args.validate().map_err(HarnessError::Config)?;

        Ok(Self {
            worker_count: args.workers,
            visibility_mode: args.mode,
            pool_capacity: args.effective_capacity(),
            runs: args.runs,
            join_timeout: args.join_timeout_ms.map(Duration::from_millis),

            output_format: args.output_format,
            quiet: args.quiet,
            verbose: args.verbose,
        })
    }

    /// Configuration for `worker_count` workers with one pool thread each
    pub fn new(worker_count: usize, visibility_mode: VisibilityMode) -> Self {
        Self {
            worker_count,
            visibility_mode,
            pool_capacity: worker_count,
            ..Self::default()
        }
    }

    /// Check the values that must hold before any thread is spawned
    pub fn validate(&self) -> Result<()> {
        if self.worker_count == 0 {
            return Err(HarnessError::Config(
                "worker count must be at least 1".to_string(),
            ));
        }
        if self.pool_capacity == 0 {
            return Err(HarnessError::Config(
                "pool capacity must be at least 1".to_string(),
            ));
        }
        if self.runs == 0 {
            return Err(HarnessError::Config("runs must be at least 1".to_string()));
        }
        if self.join_timeout == Some(Duration::ZERO) {
            return Err(HarnessError::Config(
                "join timeout must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}
