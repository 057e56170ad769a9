//! Axum middleware things
//!

use axum::http::{header::CONTENT_TYPE, HeaderName, Method};
use portal_shared::UPLOAD_CODE_HEADER;
use tower_http::cors::{Any, CorsLayer};

pub fn corslayer() -> CorsLayer {
    CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([CONTENT_TYPE, HeaderName::from_static(UPLOAD_CODE_HEADER)])
        // the front-end may be served from anywhere
        .allow_origin(Any)
}
