use std::process::ExitCode;

use access_counts::cli;

// Range 0 covers the whole file and is counted inline; no worker threads.
fn main() -> anyhow::Result<ExitCode> {
    cli::main(1)
}
