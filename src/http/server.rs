//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Wrap the built route tree in the fixed middleware pipeline
//! - Bind the router to a listener with peer addresses available
//! - Stop accepting on the shutdown future and drain open connections

use std::future::Future;
use std::net::SocketAddr;

use axum::middleware::from_fn_with_state;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};

use crate::config::AppConfig;
use crate::http::middleware::{
    access_log_middleware, cors_layer, recovery_middleware, AccessLog, Recovery,
};
use crate::observability::metrics::{metrics_middleware, Prometheus};

/// The process-wide middleware stack.
///
/// Stages can be enabled, disabled or reconfigured; their relative order
/// cannot change.
#[derive(Clone, Default)]
pub struct Pipeline {
    recovery: Recovery,
    access_log: AccessLog,
    cors: bool,
    metrics: Option<Prometheus>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            recovery: Recovery::from_config(&config.recovery),
            access_log: AccessLog::from_config(&config.access_log),
            cors: config.cors.enabled,
            metrics: None,
        }
    }

    pub fn access_log(mut self, access_log: AccessLog) -> Self {
        self.access_log = access_log;
        self
    }

    pub fn recovery(mut self, recovery: Recovery) -> Self {
        self.recovery = recovery;
        self
    }

    pub fn cors(mut self, enabled: bool) -> Self {
        self.cors = enabled;
        self
    }

    pub fn metrics(mut self, prometheus: Prometheus) -> Self {
        self.metrics = Some(prometheus);
        self
    }

    /// Wrap `router`. The last layer added is the outermost.
    pub fn apply(&self, router: Router) -> Router {
        let mut router = router;

        if let Some(prometheus) = &self.metrics {
            router = router.layer(from_fn_with_state(prometheus.clone(), metrics_middleware));
        }
        if self.cors {
            router = router.layer(cors_layer());
        }

        router
            .layer(from_fn_with_state(self.access_log.clone(), access_log_middleware))
            .layer(from_fn_with_state(self.recovery.clone(), recovery_middleware))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }
}

/// HTTP server for a fully assembled router.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(router: Router) -> Self {
        Self { router }
    }

    /// Serve until `shutdown` resolves, then wait for open connections.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
