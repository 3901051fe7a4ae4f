//! Cross-origin headers.
//!
//! The allowed and exposed header sets are fixed. The request origin is
//! mirrored because credentials cannot be combined with a wildcard origin.

use axum::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_ORIGIN, AUTHORIZATION, CONTENT_LENGTH,
    CONTENT_TYPE,
};
use axum::http::{HeaderName, Method};
use tower_http::cors::{AllowOrigin, CorsLayer};

pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_credentials(true)
        .allow_methods([Method::POST, Method::GET, Method::OPTIONS])
        .allow_headers([
            CONTENT_TYPE,
            HeaderName::from_static("accesstoken"),
            HeaderName::from_static("x-csrf-token"),
            AUTHORIZATION,
            HeaderName::from_static("token"),
        ])
        .expose_headers([
            CONTENT_LENGTH,
            ACCESS_CONTROL_ALLOW_ORIGIN,
            ACCESS_CONTROL_ALLOW_HEADERS,
            CONTENT_TYPE,
        ])
}
