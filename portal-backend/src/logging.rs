//! Request logging
//!

use std::time::Duration;

use axum::{
    http::{header::CONTENT_LENGTH, Request},
    response::Response,
};
use portal_shared::UPLOAD_CODE_HEADER;
use tower_http::{
    classify::{ServerErrorsAsFailures, SharedClassifier},
    trace::{MakeSpan, OnRequest, OnResponse, TraceLayer},
};
use tracing::{field::Empty, trace, Level, Span};

/// Builds one span per request and fills in the outcome when it's answered.
/// The upload code itself is never recorded, only whether one was sent.
#[derive(Copy, Clone, Default)]
pub(crate) struct PortalSpanner {}

impl<B> MakeSpan<B> for PortalSpanner {
    fn make_span(&mut self, request: &Request<B>) -> Span {
        tracing::info_span!(
            "request",
            method = %request.method(),
            uri = %request.uri(),
            upload_code = request.headers().contains_key(UPLOAD_CODE_HEADER),
            status = Empty,
            latency_ms = Empty,
            bytes = Empty
        )
    }
}

impl<B> OnRequest<B> for PortalSpanner {
    fn on_request(&mut self, _request: &Request<B>, _span: &Span) {
        trace!("request received");
    }
}

impl<B> OnResponse<B> for PortalSpanner {
    fn on_response(self, response: &Response<B>, latency: Duration, span: &Span) {
        let status = response.status();
        span.record("status", status.as_u16());
        span.record("latency_ms", latency.as_millis() as u64);
        if let Some(content_length) = response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
        {
            span.record("bytes", content_length);
        }

        if status.is_server_error() {
            tracing::event!(Level::WARN, "response sent");
        } else {
            tracing::event!(Level::INFO, "response sent");
        }
    }
}

pub(crate) fn logging_layer(
) -> TraceLayer<SharedClassifier<ServerErrorsAsFailures>, PortalSpanner, PortalSpanner, PortalSpanner>
{
    TraceLayer::new_for_http()
        .make_span_with(PortalSpanner::default())
        .on_request(PortalSpanner::default())
        .on_response(PortalSpanner::default())
}
