//! Panic recovery middleware.
//!
//! Runs the rest of the stack inside a guarded scope. A panic never escapes
//! this stage; it becomes one of two outcomes:
//!
//! - the peer is gone (broken pipe / connection reset): logged with the raw
//!   error only, and the connection is dropped without a status
//! - anything else: logged with the full request context and answered with
//!   an empty 500

use std::any::Any;
use std::io;
use std::panic::AssertUnwindSafe;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use futures_util::FutureExt;

use crate::config::RecoveryConfig;
use crate::http::request::{buffer_body, client_ip, path_with_query, raw_query, request_id, user_agent};
use crate::http::response;

/// State of the recovery stage.
#[derive(Debug, Clone)]
pub struct Recovery {
    capture_body: bool,
    max_body_bytes: usize,
}

impl Recovery {
    pub fn new() -> Self {
        Self {
            capture_body: false,
            max_body_bytes: 1024 * 1024,
        }
    }

    pub fn from_config(config: &RecoveryConfig) -> Self {
        Self {
            capture_body: config.capture_body,
            max_body_bytes: config.max_body_bytes,
        }
    }

    pub fn capture_body(mut self, enabled: bool) -> Self {
        self.capture_body = enabled;
        self
    }
}

impl Default for Recovery {
    fn default() -> Self {
        Self::new()
    }
}

/// What a caught panic means for the connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// The remote peer disconnected; nothing can be written.
    BrokenConnection(String),
    /// A genuine fault in a handler or deeper middleware.
    Fault(String),
}

impl Failure {
    pub fn classify(payload: &(dyn Any + Send)) -> Self {
        let message = panic_message(payload);

        if let Some(err) = payload.downcast_ref::<io::Error>() {
            if matches!(err.kind(), io::ErrorKind::BrokenPipe | io::ErrorKind::ConnectionReset) {
                return Failure::BrokenConnection(message);
            }
        }

        let lowered = message.to_lowercase();
        if lowered.contains("broken pipe") || lowered.contains("connection reset by peer") {
            Failure::BrokenConnection(message)
        } else {
            Failure::Fault(message)
        }
    }
}

/// Render a panic payload as text.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(err) = payload.downcast_ref::<io::Error>() {
        err.to_string()
    } else {
        "unknown panic".to_string()
    }
}

pub async fn recovery_middleware(
    State(recovery): State<Recovery>,
    req: Request,
    next: Next,
) -> Response {
    let path = path_with_query(&req);
    let method = req.method().clone();
    let query = raw_query(&req).to_string();
    let ip = client_ip(&req);
    let agent = user_agent(&req).to_string();
    let request_id = request_id(req.headers()).to_string();

    let (req, body) = if recovery.capture_body {
        buffer_body(req, recovery.max_body_bytes).await
    } else {
        (req, String::new())
    };

    let payload = match AssertUnwindSafe(next.run(req)).catch_unwind().await {
        Ok(response) => return response,
        Err(payload) => payload,
    };

    match Failure::classify(payload.as_ref()) {
        Failure::BrokenConnection(err) => {
            tracing::error!(err = %err, "broken connection");
            response::aborted(err)
        }
        Failure::Fault(err) => {
            tracing::error!(
                error = %err,
                method = %method,
                path = %path,
                query = %query,
                ip = %ip,
                user_agent = %agent,
                request_id = %request_id,
                body = %body,
                "{}",
                path
            );
            response::internal_error()
        }
    }
}
