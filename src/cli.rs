//! Command-line entry shared by the binaries.
//!
//! Every service binary does the same thing around its own services: load
//! the config, install logging, run the lifecycle and turn the outcome into
//! an exit code. Only the `mount` callback differs.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use crate::app::App;
use crate::config::{load_config, AppConfig};
use crate::lifecycle::Lifecycle;
use crate::observability::init_logging;

#[derive(Debug, Parser)]
#[command(about = "HTTP service with logging, recovery, metrics and graceful shutdown", long_about = None)]
pub struct Cli {
    /// TOML configuration file; defaults apply when omitted.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    pub bind: Option<String>,
}

/// Run a service until SIGINT/SIGTERM.
///
/// Exits non-zero on a config, logging or startup error, and when the drain
/// overruns its deadline.
pub async fn run<F>(cli: Cli, mount: F) -> ExitCode
where
    F: FnOnce(&mut App),
{
    let config = match &cli.config {
        Some(path) => match load_config(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("failed to load {}: {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => AppConfig::default(),
    };

    if let Err(e) = init_logging(&config.log_config()) {
        eprintln!("failed to initialize logging: {}", e);
        return ExitCode::FAILURE;
    }

    let bind = cli
        .bind
        .unwrap_or_else(|| config.listener.bind_address.clone());

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = %config.environment,
        bind_address = %bind,
        shutdown_timeout_secs = config.listener.shutdown_timeout_secs,
        "Configuration loaded"
    );

    let mut app = App::new(config);
    mount(&mut app);

    match Lifecycle::new(app).run_graceful(&bind).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Service terminated");
            ExitCode::FAILURE
        }
    }
}
