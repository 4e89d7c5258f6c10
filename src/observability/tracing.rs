//! Span status helpers.
//!
//! Spans use the OpenTelemetry field names understood by
//! `tracing-opentelemetry` (`otel.kind`, `otel.status_code`,
//! `otel.status_message`). Status fields must be declared as
//! `tracing::field::Empty` when the span is opened; they are filled in once,
//! before the last handle to the span is dropped.
//!
//! Trace context crosses process boundaries as a W3C `traceparent` header.

use std::fmt::Display;

use axum::http::HeaderMap;
use opentelemetry::propagation::TextMapPropagator;
use opentelemetry::trace::TraceContextExt;
use opentelemetry_http::{HeaderExtractor, HeaderInjector};
use opentelemetry_sdk::propagation::TraceContextPropagator;
use tracing::Span;
use tracing_opentelemetry::OpenTelemetrySpanExt;

pub const STATUS_CODE: &str = "otel.status_code";
pub const STATUS_MESSAGE: &str = "otel.status_message";
pub const ERROR: &str = "error";

/// Final status of a span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanStatus {
    Ok,
    Error,
}

impl SpanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpanStatus::Ok => "OK",
            SpanStatus::Error => "ERROR",
        }
    }
}

pub fn set_ok(span: &Span) {
    span.record(STATUS_CODE, SpanStatus::Ok.as_str());
}

pub fn set_error(span: &Span, message: &str) {
    span.record(STATUS_CODE, SpanStatus::Error.as_str());
    span.record(STATUS_MESSAGE, message);
}

/// Mark `span` failed and attach `error` to it, both as a field and as an
/// event emitted inside the span.
pub fn record_error<E: Display>(span: &Span, message: &str, error: &E) {
    set_error(span, message);
    span.record(ERROR, tracing::field::display(error));
    span.in_scope(|| tracing::error!(error = %error, "{}", message));
}

/// Write the trace context of `span` into outgoing `headers`. Writes nothing
/// when no OpenTelemetry layer is installed.
pub fn inject_context(span: &Span, headers: &mut HeaderMap) {
    TraceContextPropagator::new().inject_context(&span.context(), &mut HeaderInjector(headers));
}

/// Continue the trace carried by incoming `headers` in `span`. Call before
/// `span` is first entered.
pub fn adopt_remote_parent(span: &Span, headers: &HeaderMap) {
    let parent = TraceContextPropagator::new().extract(&HeaderExtractor(headers));
    if parent.span().span_context().is_valid() {
        let _ = span.set_parent(parent);
    }
}
