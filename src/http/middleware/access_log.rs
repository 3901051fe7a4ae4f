//! Access log middleware.
//!
//! One `info` line per request with status, method, path, query, client
//! address, user agent, latency and (optionally) the body. When a handler
//! attached framework-level errors to its response, each error is logged at
//! `error` instead and the access line is not written.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;

use crate::config::AccessLogConfig;
use crate::http::request::{buffer_body, client_ip, path_with_query, raw_query, request_id, user_agent};
use crate::http::response::RequestErrors;

type SkipFn = Arc<dyn Fn(&Request) -> bool + Send + Sync>;

/// State of the access log stage.
#[derive(Clone)]
pub struct AccessLog {
    skip_paths: Arc<HashSet<String>>,
    skip: Option<SkipFn>,
    capture_body: bool,
    max_body_bytes: usize,
}

impl AccessLog {
    pub fn new() -> Self {
        Self {
            skip_paths: Arc::new(HashSet::new()),
            skip: None,
            capture_body: false,
            max_body_bytes: 1024 * 1024,
        }
    }

    pub fn from_config(config: &AccessLogConfig) -> Self {
        Self {
            skip_paths: Arc::new(config.skip_paths.iter().cloned().collect()),
            skip: None,
            capture_body: config.capture_body,
            max_body_bytes: config.max_body_bytes,
        }
    }

    /// Never log requests for which `predicate` holds.
    pub fn skip_when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Request) -> bool + Send + Sync + 'static,
    {
        self.skip = Some(Arc::new(predicate));
        self
    }

    pub fn capture_body(mut self, enabled: bool) -> Self {
        self.capture_body = enabled;
        self
    }

    pub fn max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = limit;
        self
    }

    fn should_skip(&self, req: &Request) -> bool {
        self.skip_paths.contains(req.uri().path())
            || self.skip.as_ref().is_some_and(|skip| skip(req))
    }
}

impl Default for AccessLog {
    fn default() -> Self {
        Self::new()
    }
}

pub async fn access_log_middleware(
    State(access_log): State<AccessLog>,
    req: Request,
    next: Next,
) -> Response {
    if access_log.should_skip(&req) {
        return next.run(req).await;
    }

    let start = Instant::now();
    let path = path_with_query(&req);
    let method = req.method().clone();
    let query = raw_query(&req).to_string();
    let ip = client_ip(&req);
    let agent = user_agent(&req).to_string();
    let request_id = request_id(req.headers()).to_string();

    let (req, body) = if access_log.capture_body {
        buffer_body(req, access_log.max_body_bytes).await
    } else {
        (req, String::new())
    };

    let response = next.run(req).await;
    let latency = start.elapsed();

    match response.extensions().get::<RequestErrors>() {
        Some(errors) if !errors.is_empty() => {
            for error in errors.iter() {
                tracing::error!(request_id = %request_id, "{}", error);
            }
        }
        _ => {
            tracing::info!(
                status = response.status().as_u16(),
                method = %method,
                path = %path,
                query = %query,
                ip = %ip,
                user_agent = %agent,
                latency = ?latency,
                request_id = %request_id,
                body = %body,
                "{}",
                path
            );
        }
    }

    response
}
