//! Service scaffold: the plumbing every HTTP service in the fleet shares.
//!
//! # Architecture Overview
//!
//! ```text
//!   config ──▶ App ◀── services (RouteService), storage clients
//!               │
//!               ▼
//!          Lifecycle ── startup: mount services → route groups → router
//!               │
//!               ▼
//!   request ─▶ request id → recovery → access log → CORS → metrics
//!               → group layers → handler
//!               │
//!   SIGINT/SIGTERM → drain (bounded) → close storage → exit
//! ```

pub mod app;
pub mod cli;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;
pub mod service;
pub mod storage;

pub use app::App;
pub use config::{AppConfig, EnvironmentMode};
pub use http::{HttpServer, Pipeline, RequestError};
pub use lifecycle::{Lifecycle, LifecycleError, LifecycleState, Shutdown};
pub use routing::{GroupRegistry, RouteGroup};
pub use service::RouteService;
pub use storage::{Storage, StorageSet};
