//! racebench library
//!
//! Reproduces lost updates when workers read a shared counter and increment
//! it without a single indivisible read-modify-write, and measures how often
//! they happen under each visibility mode.

pub mod benchmark;
pub mod config;
pub mod metrics;
pub mod utils;
