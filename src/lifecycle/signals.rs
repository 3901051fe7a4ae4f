//! OS signal handling.
//!
//! # Responsibilities
//! - Register handlers for SIGINT and SIGTERM
//! - Resolve once either arrives
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - Handlers are registered when the future is created, before the listener
//!   binds, so a SIGTERM during startup drains instead of killing the process

use futures_util::future::BoxFuture;

/// Resolve on SIGINT or SIGTERM (Ctrl+C elsewhere).
///
/// Must be called inside a Tokio runtime.
pub fn wait_for_termination() -> BoxFuture<'static, ()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
            (Ok(mut terminate), Ok(mut interrupt)) => {
                return Box::pin(async move {
                    tokio::select! {
                        _ = interrupt.recv() => tracing::info!(signal = "SIGINT", "Shutdown signal received"),
                        _ = terminate.recv() => tracing::info!(signal = "SIGTERM", "Shutdown signal received"),
                    }
                });
            }
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!(error = %e, "Signal handlers unavailable, listening for Ctrl+C only");
            }
        }
    }

    Box::pin(ctrl_c())
}

async fn ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!(signal = "SIGINT", "Shutdown signal received"),
        Err(e) => {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    }
}
