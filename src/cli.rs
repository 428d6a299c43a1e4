use std::{path::PathBuf, process::ExitCode};

use anyhow::Context;
use clap::Parser;
use log::{error, info, LevelFilter};
use simple_logger::SimpleLogger;

use crate::orchestrator;

#[derive(Debug, Parser)]
#[command(about = "Count hits per path and day in a fixed-layout access log")]
pub struct Args {
    /// Access log to read
    pub input: PathBuf,

    /// JSON report to write
    pub output: PathBuf,

    #[arg(long, default_value = "info", help = "Logging level (error, warn, info, debug, trace)")]
    pub log_level: LevelFilter,
}

/// Shared entry point of both binaries; only the worker count differs.
///
/// A failed run is logged once and turned into a failing exit code; only
/// logger setup errors travel back through `main`.
pub fn main(workers: usize) -> anyhow::Result<ExitCode> {
    let args = Args::parse();
    SimpleLogger::new()
        .with_level(args.log_level)
        .init()
        .context("failed to initialise logging")?;

    match orchestrator::run(&args.input, &args.output, workers) {
        Ok(summary) => {
            info!("done: {summary:?}");
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            match e.range() {
                Some(range) => error!("range {range} failed, no output written: {e}"),
                None => error!("counting {} failed, no output written: {e}", args.input.display()),
            }
            Ok(ExitCode::FAILURE)
        }
    }
}
