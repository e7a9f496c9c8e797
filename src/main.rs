//! racebench - lost-update harness for concurrent counter increments
//!
//! N workers each read a shared counter, record what they saw and increment
//! it. Run it several times: outside atomic-rmw mode the traces keep changing.

use std::io;

use anyhow::Result;
use tracing::{error, Level};
use tracing_subscriber::FmtSubscriber;

use racebench::benchmark::Orchestrator;
use racebench::config::{CliArgs, HarnessConfig, OutputFormat};
use racebench::metrics::{OutcomeSummary, Reporter};

fn setup_logging(verbose: bool, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else if verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(io::stderr)
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("racebench: a tracing subscriber is already installed");
    }
}

fn print_banner(config: &HarnessConfig) {
    if config.quiet || config.output_format == OutputFormat::Json {
        return;
    }

    println!("racebench v{}", env!("CARGO_PKG_VERSION"));
    println!("====================================");
    println!(
        "Workers: {}, Pool threads: {}, Mode: {}",
        config.worker_count, config.pool_capacity, config.visibility_mode
    );
    println!("Runs: {}", config.runs);
    if let Some(timeout) = config.join_timeout {
        println!("Join timeout: {}ms", timeout.as_millis());
    }
    println!("====================================\n");
}

fn run() -> Result<()> {
    // Parse CLI arguments
    let args = CliArgs::parse_args();

    // Setup logging
    setup_logging(args.verbose, args.quiet);

    // Build configuration
    let config = HarnessConfig::from_cli(&args)?;

    print_banner(&config);

    let orchestrator = Orchestrator::new(config.clone())?;
    let outcomes = orchestrator.run_all()?;

    let summary = OutcomeSummary::from_outcomes(
        config.visibility_mode,
        config.worker_count,
        &outcomes,
    );

    let stdout = io::stdout();
    let mut out = stdout.lock();
    Reporter::new(config.output_format).report(&mut out, &outcomes, &summary)?;

    Ok(())
}

fn main() {
    if let Err(e) = run() {
        error!("Error: {:#}", e);
        std::process::exit(1);
    }
}
