//! Health endpoint backed by the storage health checks.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::routing::{GroupRegistry, RegistryError};
use crate::service::RouteService;
use crate::storage::StorageSet;

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failing: Vec<String>,
}

/// Mounts `GET <path>` on the root group.
pub struct HealthService {
    storage: StorageSet,
    path: String,
}

impl HealthService {
    pub fn new(storage: StorageSet, path: impl Into<String>) -> Self {
        Self {
            storage,
            path: path.into(),
        }
    }
}

impl RouteService for HealthService {
    fn mount(&self, groups: &GroupRegistry) -> Result<(), RegistryError> {
        let storage = self.storage.clone();
        groups.root().get(&self.path, move || {
            let storage = storage.clone();
            async move { health_report(&storage).await }
        });
        Ok(())
    }

    fn name(&self) -> &str {
        "health"
    }
}

async fn health_report(storage: &StorageSet) -> Response {
    let failing: Vec<String> = storage
        .health_check_all()
        .await
        .into_iter()
        .filter(|status| !status.is_healthy())
        .map(|status| status.name)
        .collect();

    if failing.is_empty() {
        (StatusCode::OK, Json(HealthReport { status: "ok", failing })).into_response()
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthReport {
                status: "unavailable",
                failing,
            }),
        )
            .into_response()
    }
}
