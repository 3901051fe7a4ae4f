//! Startup orchestration.
//!
//! # Responsibilities
//! - Mount every registered service, in order, exactly once
//! - Install metrics and mount the scrape and health endpoints
//! - Print the route table in debug run mode
//! - Wrap the route tree in the middleware pipeline
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Nothing here touches the network; the listener binds afterwards

use std::sync::Arc;

use axum::Router;

use crate::app::App;
use crate::config::RunMode;
use crate::lifecycle::LifecycleError;
use crate::observability::metrics::Prometheus;
use crate::storage::health::HealthService;

/// Turn an assembled [`App`] into the router that will be served.
pub fn assemble(app: App) -> Result<Router, LifecycleError> {
    let mut parts = app.into_parts();
    let root = parts.groups.root().clone();

    if parts.config.health.enabled {
        parts.services.register(Arc::new(HealthService::new(
            parts.storage.clone(),
            parts.config.health.path.clone(),
        )));
    }

    parts.services.mount_all(&parts.groups)?;

    let mut pipeline = parts.pipeline;
    if parts.config.metrics.enabled {
        let prometheus = Prometheus::install(&parts.config.metrics)?;
        prometheus.mount(&root);
        pipeline = pipeline.metrics(prometheus);
    }

    let mode = parts.config.environment.run_mode();
    if mode == RunMode::Debug {
        for route in root.routes() {
            tracing::debug!(method = route.method, path = %route.path, "[route]");
        }
    }

    tracing::info!(
        environment = %parts.config.environment,
        mode = ?mode,
        groups = ?parts.groups.prefixes(),
        storage = ?parts.storage.names(),
        "Application assembled"
    );

    Ok(pipeline.apply(root.build()))
}
