//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Install the process-wide Prometheus recorder (once)
//! - Observe every request: count, latency, request and response size
//! - Serve the scrape endpoint from the root route group
//! - Describe custom metrics declared by services
//!
//! # Metrics
//! - `<ns>_<sub>_requests_total` (counter): code, method, handler, host, url
//! - `<ns>_<sub>_request_duration_millisecond` (histogram): code, method, url
//! - `<ns>_<sub>_request_size_bytes` (summary)
//! - `<ns>_<sub>_response_size_bytes` (summary)
//!
//! # Design Decisions
//! - Low-overhead metric updates (atomic operations)
//! - The scrape path itself is not observed
//! - Histograms render as summaries unless buckets are configured; request
//!   duration gets explicit buckets

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use axum::body::HttpBody;
use axum::extract::{MatchedPath, Request, State};
use axum::http::header::HOST;
use axum::middleware::Next;
use axum::response::Response;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use thiserror::Error;

use crate::config::MetricsConfig;
use crate::http::request::content_length;
use crate::routing::RouteGroup;

/// Latency buckets in milliseconds.
const DURATION_BUCKETS_MS: [f64; 12] = [
    1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0,
];

static HANDLE: Mutex<Option<PrometheusHandle>> = Mutex::new(None);

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("metric name CAN NOT be empty")]
    EmptyName,

    #[error("failed to install metrics recorder: {0}")]
    Install(String),
}

/// Shape of a custom metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Counter,
    Gauge,
    Histogram,
    /// Recorded as a histogram; the exporter renders quantiles.
    Summary,
}

/// Declaration of a custom metric.
#[derive(Debug, Clone)]
pub struct Metric {
    pub namespace: String,
    pub subsystem: String,
    pub name: String,
    pub help: String,
    pub kind: MetricKind,
    /// Label keys the metric is expected to carry.
    pub labels: Vec<String>,
}

impl Metric {
    pub fn full_name(&self) -> String {
        build_name(&self.namespace, &self.subsystem, &self.name)
    }
}

/// Join name parts with `_`, skipping empty ones.
pub fn build_name(namespace: &str, subsystem: &str, name: &str) -> String {
    [namespace, subsystem, name]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("_")
}

/// Describe a custom metric to the recorder. Returns its full name.
pub fn register_metric(metric: &Metric) -> Result<String, MetricsError> {
    if metric.name.is_empty() {
        return Err(MetricsError::EmptyName);
    }

    let full_name = metric.full_name();
    match metric.kind {
        MetricKind::Counter => describe_counter!(full_name.clone(), metric.help.clone()),
        MetricKind::Gauge => describe_gauge!(full_name.clone(), metric.help.clone()),
        MetricKind::Histogram | MetricKind::Summary => {
            describe_histogram!(full_name.clone(), metric.help.clone())
        }
    }

    tracing::debug!(metric = %full_name, kind = ?metric.kind, labels = ?metric.labels, "Metric registered");
    Ok(full_name)
}

/// Install the global recorder, or return the one already installed.
pub fn install_recorder() -> Result<PrometheusHandle, MetricsError> {
    let mut slot = HANDLE.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(handle) = slot.as_ref() {
        return Ok(handle.clone());
    }

    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Suffix("request_duration_millisecond".to_string()),
            &DURATION_BUCKETS_MS,
        )
        .map_err(|e| MetricsError::Install(e.to_string()))?
        .install_recorder()
        .map_err(|e| MetricsError::Install(e.to_string()))?;

    *slot = Some(handle.clone());
    Ok(handle)
}

struct Names {
    requests_total: String,
    request_duration: String,
    request_size: String,
    response_size: String,
}

/// Request observer plus scrape endpoint.
#[derive(Clone)]
pub struct Prometheus {
    names: Arc<Names>,
    metrics_path: String,
    handle: PrometheusHandle,
}

impl Prometheus {
    pub fn install(config: &MetricsConfig) -> Result<Self, MetricsError> {
        let handle = install_recorder()?;
        let name = |suffix: &str| build_name(&config.namespace, &config.subsystem, suffix);

        let names = Names {
            requests_total: name("requests_total"),
            request_duration: name("request_duration_millisecond"),
            request_size: name("request_size_bytes"),
            response_size: name("response_size_bytes"),
        };

        describe_counter!(
            names.requests_total.clone(),
            "How many HTTP requests processed, partitioned by status code and HTTP method."
        );
        describe_histogram!(
            names.request_duration.clone(),
            "The HTTP request latencies in Millisecond."
        );
        describe_histogram!(names.request_size.clone(), "The HTTP request sizes in bytes.");
        describe_histogram!(names.response_size.clone(), "The HTTP response sizes in bytes.");

        tracing::info!(path = %config.path, "Prometheus metrics installed");

        Ok(Self {
            names: Arc::new(names),
            metrics_path: config.path.clone(),
            handle,
        })
    }

    pub fn metrics_path(&self) -> &str {
        &self.metrics_path
    }

    /// Current exposition text.
    pub fn render(&self) -> String {
        self.handle.render()
    }

    /// Mount `GET <metrics_path>` on `group`.
    pub fn mount(&self, group: &RouteGroup) {
        let exporter = self.clone();
        group.get(&self.metrics_path, move || {
            let exporter = exporter.clone();
            async move { exporter.render() }
        });
    }
}

pub async fn metrics_middleware(
    State(prometheus): State<Prometheus>,
    req: Request,
    next: Next,
) -> Response {
    let url = req.uri().path().to_string();
    if url == prometheus.metrics_path {
        return next.run(req).await;
    }

    let start = Instant::now();
    let method = req.method().to_string();
    let host = req
        .headers()
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or_else(|| req.uri().host().map(str::to_string))
        .unwrap_or_default();
    let handler = req
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let request_size = req
        .body()
        .size_hint()
        .exact()
        .or_else(|| content_length(req.headers()))
        .unwrap_or(0);

    let response = next.run(req).await;

    let code = response.status().as_u16().to_string();
    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
    let response_size = response.body().size_hint().exact().unwrap_or(0);
    let names = &prometheus.names;

    histogram!(
        names.request_duration.clone(),
        "code" => code.clone(),
        "method" => method.clone(),
        "url" => url.clone()
    )
    .record(elapsed_ms);
    counter!(
        names.requests_total.clone(),
        "code" => code,
        "method" => method,
        "handler" => handler,
        "host" => host,
        "url" => url
    )
    .increment(1);
    histogram!(names.request_size.clone()).record(request_size as f64);
    histogram!(names.response_size.clone()).record(response_size as f64);

    response
}
