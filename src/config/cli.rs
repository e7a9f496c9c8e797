//! Command-line argument parsing

use clap::{Parser, ValueEnum};

use crate::benchmark::VisibilityMode;

/// Reproduce and measure lost updates when N workers race on one counter
#[derive(Parser, Debug, Clone)]
#[command(name = "racebench")]
#[command(version, about, long_about = None)]
pub struct CliArgs {
    // ===== Experiment =====
    /// Number of workers, each reading then incrementing the counter once
    #[arg(short = 'n', long = "workers", default_value_t = 10)]
    pub workers: usize,

    /// Visibility/atomicity guarantee of the shared counter
    #[arg(short = 'm', long = "mode", value_enum, default_value_t = VisibilityMode::None)]
    pub mode: VisibilityMode,

    /// Number of pool threads (defaults to the worker count)
    #[arg(short = 'c', long = "capacity")]
    pub capacity: Option<usize>,

    /// Independent repetitions of the experiment
    #[arg(short = 'r', long = "runs", default_value_t = 1)]
    pub runs: u32,

    /// Fail a run whose workers have not all finished after this many milliseconds
    #[arg(long = "join-timeout")]
    pub join_timeout_ms: Option<u64>,

    // ===== Output Options =====
    /// Output format
    #[arg(long = "output-format", value_enum, default_value_t = OutputFormat::Text)]
    pub output_format: OutputFormat,

    /// Quiet mode (only the traces are printed)
    #[arg(short = 'q', long = "quiet")]
    pub quiet: bool,

    /// Verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

/// Output format for results
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl CliArgs {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate argument values
    pub fn validate(&self) -> Result<(), String> {
        if self.workers == 0 {
            return Err("--workers must be at least 1".to_string());
        }

        if self.capacity == Some(0) {
            return Err("--capacity must be at least 1".to_string());
        }

        if self.runs == 0 {
            return Err("--runs must be at least 1".to_string());
        }

        if self.join_timeout_ms == Some(0) {
            return Err("--join-timeout must be greater than 0".to_string());
        }

        if self.quiet && self.verbose {
            return Err("--quiet and --verbose are mutually exclusive".to_string());
        }

        Ok(())
    }

    /// Get effective pool capacity (unset = one thread per worker)
    pub fn effective_capacity(&self) -> usize {
        self.capacity.unwrap_or(self.workers)
    }
}
