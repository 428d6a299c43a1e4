use std::process::ExitCode;

use access_counts::{cli, layout::WORKERS};

fn main() -> anyhow::Result<ExitCode> {
    cli::main(WORKERS)
}
