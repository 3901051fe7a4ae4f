//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events through `tracing`)
//!     → metrics.rs (request counters and latency histograms)
//!
//! Consumers:
//!     → stdout (console for humans, JSON for aggregation)
//!     → Metrics endpoint (Prometheus scrape, mounted on the root group)
//! ```
//!
//! # Design Decisions
//! - Log format is picked once at startup from the environment
//! - Request ID flows through every access and error line
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, LogConfig, LogFormat, LoggingError};
pub use metrics::{register_metric, Metric, MetricKind, MetricsError, Prometheus};
