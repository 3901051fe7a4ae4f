//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Unbound
//!     → Starting  (startup.rs: mount services, build router)
//!     → bind listener (failure is fatal)
//!     → Serving   (serve task running)
//!     → Draining  (signals.rs: SIGINT/SIGTERM, or Shutdown::trigger)
//!     → Stopped   (listener closed, storage closed)
//! ```
//!
//! # Design Decisions
//! - Ordered startup: routes first, listener last (traffic only when ready)
//! - Ordered shutdown: stop accept, drain, close storage
//! - Draining has a deadline; past it in-flight requests are cut and the run
//!   reports `ShutdownTimeout`

use std::future::Future;
use std::io;
use std::time::Duration;

use axum::middleware::from_fn_with_state;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinError;

use crate::app::App;
use crate::http::HttpServer;
use crate::observability::MetricsError;
use crate::service::MountError;

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;

/// Grace period for cut requests to unwind before the serve task is aborted.
const FORCE_CLOSE_GRACE: Duration = Duration::from_secs(1);

/// Where the process is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Unbound,
    Starting,
    Serving,
    Draining,
    Stopped,
}

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Mount(#[from] MountError),

    #[error(transparent)]
    Metrics(#[from] MetricsError),

    #[error("start service failed on {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] io::Error),

    #[error("Server forced to shutdown: drain exceeded {0:?}")]
    ShutdownTimeout(Duration),
}

enum Bind {
    Address(String),
    Listener(TcpListener),
}

/// Drives an [`App`] from assembly to exit.
pub struct Lifecycle {
    app: App,
    state: watch::Sender<LifecycleState>,
    shutdown: Shutdown,
}

impl Lifecycle {
    pub fn new(app: App) -> Self {
        let (state, _) = watch::channel(LifecycleState::Unbound);
        Self {
            app,
            state,
            shutdown: Shutdown::new(),
        }
    }

    pub fn state(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    /// Handle that starts draining when triggered, same as a signal.
    pub fn shutdown_handle(&self) -> Shutdown {
        self.shutdown.clone()
    }

    /// Bind `addr` and serve until SIGINT/SIGTERM or the shutdown handle.
    pub async fn run_graceful(self, addr: &str) -> Result<(), LifecycleError> {
        self.run(Bind::Address(addr.to_string()), signals::wait_for_termination())
            .await
    }

    /// Serve on an already-bound listener until `signal` resolves or the
    /// shutdown handle fires.
    pub async fn run_with_listener<F>(self, listener: TcpListener, signal: F) -> Result<(), LifecycleError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.run(Bind::Listener(listener), signal).await
    }

    async fn run<F>(self, bind: Bind, signal: F) -> Result<(), LifecycleError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let Lifecycle { app, state, shutdown } = self;
        let storage = app.storage().clone();

        let result = drive(app, bind, signal, &state, &shutdown).await;

        storage.close_all().await;
        state.send_replace(LifecycleState::Stopped);

        match &result {
            Ok(()) => tracing::info!("Server exiting"),
            Err(e) => tracing::error!(error = %e, "Server stopped with error"),
        }
        result
    }
}

async fn drive<F>(
    app: App,
    bind: Bind,
    signal: F,
    state: &watch::Sender<LifecycleState>,
    shutdown: &Shutdown,
) -> Result<(), LifecycleError>
where
    F: Future<Output = ()> + Send + 'static,
{
    state.send_replace(LifecycleState::Starting);
    let deadline = Duration::from_secs(app.config().listener.shutdown_timeout_secs);

    let force = Shutdown::new();
    let router = startup::assemble(app)?
        .layer(from_fn_with_state(force.clone(), shutdown::force_close_guard));

    let listener = match bind {
        Bind::Address(address) => match TcpListener::bind(&address).await {
            Ok(listener) => listener,
            Err(source) => return Err(LifecycleError::Bind { address, source }),
        },
        Bind::Listener(listener) => listener,
    };

    let trigger = shutdown.clone();
    let watcher = tokio::spawn(async move {
        signal.await;
        trigger.trigger();
    });

    let drained = shutdown.clone();
    let mut serve = tokio::spawn(
        HttpServer::new(router).run(listener, async move { drained.wait().await }),
    );
    state.send_replace(LifecycleState::Serving);

    let early_exit = tokio::select! {
        _ = shutdown.wait() => None,
        joined = &mut serve => Some(joined),
    };
    watcher.abort();

    if let Some(joined) = early_exit {
        return flatten(joined);
    }

    state.send_replace(LifecycleState::Draining);
    tracing::info!(deadline = ?deadline, "Shutting down server...");

    match tokio::time::timeout(deadline, &mut serve).await {
        Ok(joined) => flatten(joined),
        Err(_) => {
            tracing::warn!("Drain deadline exceeded, cutting in-flight requests");
            force.trigger();
            if tokio::time::timeout(FORCE_CLOSE_GRACE, &mut serve).await.is_err() {
                serve.abort();
            }
            Err(LifecycleError::ShutdownTimeout(deadline))
        }
    }
}

fn flatten(joined: Result<io::Result<()>, JoinError>) -> Result<(), LifecycleError> {
    match joined {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(LifecycleError::Serve(e)),
        Err(e) => Err(LifecycleError::Serve(io::Error::other(e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    #[tokio::test]
    async fn states_progress_to_stopped() {
        let lifecycle = Lifecycle::new(App::new(AppConfig::default()));
        let mut state = lifecycle.state();
        let handle = lifecycle.shutdown_handle();
        assert_eq!(*state.borrow(), LifecycleState::Unbound);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let run = tokio::spawn(lifecycle.run_with_listener(listener, std::future::pending()));

        state
            .wait_for(|s| *s == LifecycleState::Serving)
            .await
            .unwrap();
        handle.trigger();

        run.await.unwrap().unwrap();
        assert_eq!(*state.borrow(), LifecycleState::Stopped);
    }

    #[tokio::test]
    async fn bind_failure_is_fatal() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = taken.local_addr().unwrap().to_string();

        let lifecycle = Lifecycle::new(App::new(AppConfig::default()));
        let result = lifecycle.run_graceful(&addr).await;

        assert!(matches!(result, Err(LifecycleError::Bind { .. })));
    }

    #[tokio::test]
    async fn signal_future_starts_the_drain() {
        let lifecycle = Lifecycle::new(App::new(AppConfig::default()));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            lifecycle.run_with_listener(listener, async {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }),
        )
        .await
        .expect("lifecycle returns after the signal");

        assert!(result.is_ok());
    }
}
