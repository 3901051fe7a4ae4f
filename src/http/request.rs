//! Request inspection helpers shared by the middleware.
//!
//! # Responsibilities
//! - Extract the client address (proxy headers first, then the peer)
//! - Render path + raw query the way access lines show them
//! - Buffer a body once and put an equivalent body back for downstream
//!
//! # Design Decisions
//! - Bodies whose declared length exceeds the limit are never read, so a
//!   large upload is not destroyed by logging
//! - Streamed bodies that outgrow the limit are replayed, never dropped
//! - Non-UTF-8 bodies are logged lossily

use std::net::SocketAddr;

use axum::body::{Body, Bytes};
use axum::extract::{ConnectInfo, Request};
use axum::http::header::{CONTENT_LENGTH, USER_AGENT};
use axum::http::HeaderMap;
use futures_util::stream::{self, StreamExt};

/// Placeholder logged when the body was read but could not be collected.
pub const BODY_READ_FAILED: &str = "err when get request body";

/// Header carrying the request id.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Best-effort client address.
pub fn client_ip(req: &Request) -> String {
    if let Some(ip) = forwarded_ip(req.headers()) {
        return ip;
    }

    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_default()
}

fn forwarded_ip(headers: &HeaderMap) -> Option<String> {
    let from_forwarded_for = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty());

    let from_real_ip = || {
        headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
    };

    from_forwarded_for.or_else(from_real_ip).map(str::to_string)
}

/// `path?query`, or just the path when there is no query.
pub fn path_with_query(req: &Request) -> String {
    match req.uri().query() {
        Some(query) if !query.is_empty() => format!("{}?{}", req.uri().path(), query),
        _ => req.uri().path().to_string(),
    }
}

pub fn raw_query(req: &Request) -> &str {
    req.uri().query().unwrap_or_default()
}

pub fn user_agent(req: &Request) -> &str {
    req.headers()
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

/// Declared request size, if the client sent one.
pub fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}

/// Read the body once and hand back a request whose body replays the same bytes.
///
/// Returns the body rendered as text for logging. A body that grows past
/// `limit` while streaming is not captured; the chunks read so far are
/// replayed ahead of the unread remainder, so downstream sees every byte.
pub async fn buffer_body(req: Request, limit: usize) -> (Request, String) {
    if let Some(declared) = content_length(req.headers()) {
        if declared > limit as u64 {
            return (req, format!("<body of {} bytes not captured>", declared));
        }
    }

    let (parts, body) = req.into_parts();
    let mut rest = body.into_data_stream();
    let mut read: Vec<Bytes> = Vec::new();
    let mut size = 0usize;

    while let Some(frame) = rest.next().await {
        match frame {
            Ok(chunk) => {
                size += chunk.len();
                read.push(chunk);
                if size > limit {
                    let replay = stream::iter(read.into_iter().map(Ok)).chain(rest);
                    return (
                        Request::from_parts(parts, Body::from_stream(replay)),
                        format!("<body over {} bytes not captured>", limit),
                    );
                }
            }
            Err(e) => {
                tracing::debug!(error = %e, "Failed to buffer request body");
                let replay = read.into_iter().map(Ok).chain(std::iter::once(Err(e)));
                return (
                    Request::from_parts(parts, Body::from_stream(stream::iter(replay))),
                    BODY_READ_FAILED.to_string(),
                );
            }
        }
    }

    let bytes = match read.len() {
        0 => Bytes::new(),
        1 => read.swap_remove(0),
        _ => Bytes::from(read.concat()),
    };
    let text = String::from_utf8_lossy(&bytes).into_owned();
    (Request::from_parts(parts, Body::from(bytes)), text)
}
