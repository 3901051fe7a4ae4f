//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (single phase, before the listener binds):
//!     GroupRegistry::register(prefix, parent)
//!     → parent.group(prefix) derives a RouteGroup
//!     → services look groups up and record routes / middleware
//!
//! Freeze:
//!     root RouteGroup::build()
//!     → one axum::Router with absolute paths
//!     → wrapped by the request pipeline (http::server)
//! ```
//!
//! # Design Decisions
//! - Matching is axum's job; this layer only scopes and records
//! - Groups are handles (Arc), so lookups hand out the same group
//! - Route tables are frozen before traffic is accepted

pub mod group;
pub mod registry;

pub use group::{join_paths, GroupId, RouteGroup, RouteInfo};
pub use registry::{GroupRegistry, RegistryError};
