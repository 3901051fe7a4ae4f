//! Application context.
//!
//! `App` is what `main` builds before anything listens: the immutable
//! config, the group registry, the services to mount and the storage
//! clients to close at exit. The lifecycle consumes it, so services are
//! mounted exactly once.

use std::sync::Arc;

use axum::Router;

use crate::config::{AppConfig, EnvironmentMode};
use crate::http::middleware::{AccessLog, Recovery};
use crate::http::server::Pipeline;
use crate::lifecycle::{startup, LifecycleError};
use crate::routing::{GroupRegistry, RouteGroup};
use crate::service::{RouteService, ServiceRegistrar};
use crate::storage::{Storage, StorageSet};

pub struct App {
    config: AppConfig,
    groups: GroupRegistry,
    services: ServiceRegistrar,
    storage: StorageSet,
    pipeline: Pipeline,
}

pub(crate) struct AppParts {
    pub config: AppConfig,
    pub groups: GroupRegistry,
    pub services: ServiceRegistrar,
    pub storage: StorageSet,
    pub pipeline: Pipeline,
}

impl App {
    pub fn new(config: AppConfig) -> Self {
        let pipeline = Pipeline::from_config(&config);
        Self {
            config,
            groups: GroupRegistry::new(),
            services: ServiceRegistrar::new(),
            storage: StorageSet::new(),
            pipeline,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn environment(&self) -> EnvironmentMode {
        self.config.environment
    }

    pub fn groups(&self) -> &GroupRegistry {
        &self.groups
    }

    pub fn root(&self) -> &RouteGroup {
        self.groups.root()
    }

    /// Queue a service; services mount in registration order.
    pub fn register_service<S: RouteService + 'static>(&mut self, service: S) -> &mut Self {
        self.services.register(Arc::new(service));
        self
    }

    pub fn register_shared_service(&mut self, service: Arc<dyn RouteService>) -> &mut Self {
        self.services.register(service);
        self
    }

    pub fn register_storage<S: Storage + 'static>(&mut self, storage: S) -> &mut Self {
        self.storage.push(Arc::new(storage));
        self
    }

    pub fn storage(&self) -> &StorageSet {
        &self.storage
    }

    /// Replace the access log stage, e.g. to install a skip predicate.
    pub fn set_access_log(&mut self, access_log: AccessLog) -> &mut Self {
        self.pipeline = self.pipeline.clone().access_log(access_log);
        self
    }

    pub fn set_recovery(&mut self, recovery: Recovery) -> &mut Self {
        self.pipeline = self.pipeline.clone().recovery(recovery);
        self
    }

    /// Mount everything and return the finished router without serving it.
    pub fn into_router(self) -> Result<Router, LifecycleError> {
        startup::assemble(self)
    }

    pub(crate) fn into_parts(self) -> AppParts {
        AppParts {
            config: self.config,
            groups: self.groups,
            services: self.services,
            storage: self.storage,
            pipeline: self.pipeline,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::RegistryError;
    use axum::body::Body;
    use axum::http::{Request as HttpRequest, StatusCode};
    use futures_util::stream;
    use tower::ServiceExt;

    struct Users;

    impl RouteService for Users {
        fn mount(&self, groups: &GroupRegistry) -> Result<(), RegistryError> {
            let api = groups.register("/api", None)?;
            api.get("/users", || async { "users" });
            Ok(())
        }
    }

    #[tokio::test]
    async fn into_router_mounts_services_and_health() {
        let mut app = App::new(AppConfig::default());
        app.register_service(Users);
        let router = app.into_router().unwrap();

        for (uri, expected) in [("/api/users", StatusCode::OK), ("/healthz", StatusCode::OK)] {
            let res = router
                .clone()
                .oneshot(HttpRequest::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(res.status(), expected, "{}", uri);
        }
    }

    #[tokio::test]
    async fn health_endpoint_can_be_disabled() {
        let mut config = AppConfig::default();
        config.health.enabled = false;
        let router = App::new(config).into_router().unwrap();

        let res = router
            .oneshot(HttpRequest::builder().uri("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    struct Upload;

    impl RouteService for Upload {
        fn mount(&self, groups: &GroupRegistry) -> Result<(), RegistryError> {
            groups
                .register("/files", None)?
                .post("/upload", |body: axum::body::Bytes| async move { body.len().to_string() });
            Ok(())
        }
    }

    #[tokio::test]
    async fn streamed_upload_over_capture_limit_reaches_handler_intact() {
        let mut config = AppConfig::default();
        config.access_log.max_body_bytes = 16;
        config.recovery.max_body_bytes = 16;
        let mut app = App::new(config);
        app.register_shared_service(Arc::new(Upload));
        let router = app.into_router().unwrap();

        let chunks: Vec<Result<Vec<u8>, std::io::Error>> = (0..4).map(|_| Ok(vec![b'x'; 16])).collect();
        let req = HttpRequest::builder()
            .method("POST")
            .uri("/files/upload")
            .body(Body::from_stream(stream::iter(chunks)))
            .unwrap();

        let res = router.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let seen = axum::body::to_bytes(res.into_body(), 64).await.unwrap();
        assert_eq!(&seen[..], b"64");
    }

    struct Detached;

    impl RouteService for Detached {
        fn mount(&self, groups: &GroupRegistry) -> Result<(), RegistryError> {
            groups
                .register("/orphan", Some(&RouteGroup::root()))?
                .get("/hi", || async { "hi" });
            Ok(())
        }
    }

    #[test]
    fn group_under_detached_parent_fails_the_mount() {
        let mut app = App::new(AppConfig::default());
        app.register_service(Detached);

        match app.into_router() {
            Err(LifecycleError::Mount(e)) => {
                assert!(matches!(e.source, RegistryError::ForeignParent { .. }), "{}", e);
            }
            other => panic!("expected mount failure, got {:?}", other.map(|_| ())),
        }
    }
}
