//! Request pipeline stages.
//!
//! # Order (outermost first)
//! ```text
//! request id → recovery → access log → CORS → metrics → group layers → handler
//! ```
//!
//! The order is fixed in `http::server::Pipeline`; configuration only turns
//! stages on or off.

pub mod access_log;
pub mod cors;
pub mod recovery;

pub use access_log::{access_log_middleware, AccessLog};
pub use cors::cors_layer;
pub use recovery::{recovery_middleware, Failure, Recovery};
