//! Storage collaborators.
//!
//! # Data Flow
//! ```text
//! App::register_storage(client)         (assembly phase)
//!     → StorageSet (ordered)
//!
//! GET /healthz → StorageSet::health_check_all()   (each check ≤ 1s)
//!
//! Lifecycle, after the listener stopped:
//!     StorageSet::close_all()
//!     → every member closed, failures logged at warn
//! ```
//!
//! # Design Decisions
//! - Drivers stay outside this crate; only health and close are needed here
//! - `close` is called unconditionally; an unopened client must treat it as a no-op
//! - Close failures never escalate

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use thiserror::Error;

pub mod health;

/// Upper bound for a single health check.
pub const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("health check timed out after {0:?}")]
    Timeout(Duration),

    #[error("{0}")]
    Backend(String),
}

pub type StorageFuture<'a> = BoxFuture<'a, Result<(), StorageError>>;

/// A backing store the service depends on (SQL pool, cache client, ...).
pub trait Storage: Send + Sync {
    fn name(&self) -> &str;

    /// Cheap liveness check, e.g. a ping.
    fn health_check(&self) -> StorageFuture<'_>;

    /// Release connections. Must succeed as a no-op if never opened.
    fn close(&self) -> StorageFuture<'_>;
}

/// Ordered collection of the process's storage clients.
#[derive(Clone, Default)]
pub struct StorageSet {
    members: Vec<Arc<dyn Storage>>,
}

/// Outcome of one health check.
#[derive(Debug)]
pub struct HealthStatus {
    pub name: String,
    pub result: Result<(), StorageError>,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.result.is_ok()
    }
}

impl StorageSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, storage: Arc<dyn Storage>) {
        self.members.push(storage);
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.members.iter().map(|s| s.name().to_string()).collect()
    }

    /// Check every member, each bounded by [`HEALTH_CHECK_TIMEOUT`].
    pub async fn health_check_all(&self) -> Vec<HealthStatus> {
        let mut statuses = Vec::with_capacity(self.members.len());
        for storage in &self.members {
            let result = match tokio::time::timeout(HEALTH_CHECK_TIMEOUT, storage.health_check()).await {
                Ok(result) => result,
                Err(_) => Err(StorageError::Timeout(HEALTH_CHECK_TIMEOUT)),
            };
            if let Err(e) = &result {
                tracing::warn!(storage = %storage.name(), error = %e, "Storage health check failed");
            }
            statuses.push(HealthStatus {
                name: storage.name().to_string(),
                result,
            });
        }
        statuses
    }

    /// Close every member. Failures are logged, never returned.
    pub async fn close_all(&self) {
        for storage in &self.members {
            match storage.close().await {
                Ok(()) => tracing::info!(storage = %storage.name(), "Storage client closed"),
                Err(e) => tracing::warn!(storage = %storage.name(), error = %e, "Error when closing storage connection"),
            }
        }
        tracing::info!("All storage closed");
    }
}
