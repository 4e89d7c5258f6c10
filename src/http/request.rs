//! Request identification and request spans.
//!
//! # Responsibilities
//! - Generate a unique request ID (UUID v4) unless the caller sent one
//! - Echo the request ID on the response
//! - Open the server-kind span every handler runs inside
//! - Link that span to the caller's trace from the `traceparent` header
//!
//! # Design Decisions
//! - Request ID added before the span opens, so the span carries it
//! - The span is the trace context handed to background work

use std::time::Duration;

use axum::{
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, Request, Response},
};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tracing::{field::Empty, Span};

use crate::observability::tracing::{adopt_remote_parent, set_error, set_ok};

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

pub fn set_request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid)
}

pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::new(X_REQUEST_ID)
}

/// Open the span for one inbound request, continuing the caller's trace
/// when the request carries one.
pub fn make_request_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get(&X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(MatchedPath::as_str)
        .unwrap_or_else(|| request.uri().path());

    let span = tracing::info_span!(
        "http_request",
        otel.kind = "server",
        http.method = %request.method(),
        http.route = %route,
        request_id = %request_id,
        http.status_code = Empty,
        otel.status_code = Empty,
        otel.status_message = Empty,
    );
    adopt_remote_parent(&span, request.headers());
    span
}

/// Close out the request span with the response status.
pub fn record_response(response: &Response<Body>, latency: Duration, span: &Span) {
    let status = response.status();
    span.record("http.status_code", status.as_u16());
    if status.is_server_error() {
        set_error(span, status.canonical_reason().unwrap_or("server error"));
    } else {
        set_ok(span);
    }
    tracing::debug!(status = %status, latency_ms = latency.as_millis() as u64, "Response sent");
}
