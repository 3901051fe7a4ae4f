//! Response-side plumbing for the middleware.
//!
//! # Responsibilities
//! - Carry framework-level errors from handlers to the access log
//! - Build the two failure responses of the recovery stage
//!
//! # Design Decisions
//! - Errors ride in a response extension, never in the body
//! - A 500 never leaks diagnostic detail to the client

use std::convert::Infallible;
use std::io;

use axum::body::{Body, Bytes};
use axum::http::StatusCode;
use axum::response::{IntoResponse, IntoResponseParts, Response, ResponseParts};
use futures_util::stream;

/// Errors accumulated while handling one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestErrors(pub Vec<String>);

impl RequestErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

/// A single error attached to a response.
///
/// ```rust,ignore
/// async fn handler() -> impl IntoResponse {
///     (StatusCode::BAD_REQUEST, RequestError::new("missing field `name`"), "bad request")
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestError(pub String);

impl RequestError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl IntoResponseParts for RequestError {
    type Error = Infallible;

    fn into_response_parts(self, mut res: ResponseParts) -> Result<ResponseParts, Self::Error> {
        push_error(res.extensions_mut(), self.0);
        Ok(res)
    }
}

/// Append an error to a response built elsewhere.
pub fn attach_error(response: &mut Response, message: impl Into<String>) {
    push_error(response.extensions_mut(), message.into());
}

fn push_error(extensions: &mut axum::http::Extensions, message: String) {
    match extensions.get_mut::<RequestErrors>() {
        Some(errors) => errors.0.push(message),
        None => {
            extensions.insert(RequestErrors(vec![message]));
        }
    }
}

/// Bare 500 for a recovered fault.
pub fn internal_error() -> Response {
    StatusCode::INTERNAL_SERVER_ERROR.into_response()
}

/// Response for a peer that is already gone.
///
/// The body fails on first poll, so the transport tears the connection down
/// instead of completing a response nobody will read.
pub fn aborted(reason: String) -> Response {
    let failing = stream::once(async move {
        Err::<Bytes, io::Error>(io::Error::new(io::ErrorKind::BrokenPipe, "connection aborted"))
    });
    let mut response = Response::new(Body::from_stream(failing));
    attach_error(&mut response, reason);
    response
}
