//! Configuration module

pub mod cli;
pub mod harness_config;

pub use cli::{CliArgs, OutputFormat};
pub use harness_config::HarnessConfig;
