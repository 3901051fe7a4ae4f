//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (axum serve, fixed middleware pipeline)
//!     → middleware/ (request id, recovery, access log, CORS, metrics)
//!     → route groups → handler
//!     → response.rs (errors attached for the access log)
//!     → Send to client
//!
//! Outbound:
//!     client.rs (JSON POST to other services)
//! ```

pub mod client;
pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use request::X_REQUEST_ID;
pub use response::{RequestError, RequestErrors};
pub use server::{HttpServer, Pipeline};
