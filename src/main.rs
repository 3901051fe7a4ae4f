//! Service scaffold binary.
//!
//! Loads the configuration, installs logging and runs the health and
//! metrics endpoints until SIGINT/SIGTERM.

use std::process::ExitCode;

use clap::Parser;

use service_scaffold::cli::{self, Cli};

#[tokio::main]
async fn main() -> ExitCode {
    cli::run(Cli::parse(), |_| {}).await
}
