//! Service registration subsystem.
//!
//! # Data Flow
//! ```text
//! App::register_service(service)      (assembly phase, append-only)
//!     → ServiceRegistrar
//!
//! Lifecycle startup:
//!     ServiceRegistrar::mount_all(&GroupRegistry)
//!     → each service records routes on its groups, in order
//!     → route tree frozen, listener binds
//! ```

pub mod registrar;

pub use registrar::{MountError, RouteService, ServiceRegistrar};
