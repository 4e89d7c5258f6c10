//! Per-request HTTP metrics.
//!
//! - `<ns>_<svc>_http_requests_total` (counter)
//! - `<ns>_<svc>_http_request_duration` (histogram, milliseconds)
//!
//! labelled by method, matched route and status code.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{MatchedPath, Request, State},
    http::{Method, StatusCode},
    middleware::Next,
    response::Response,
};
use metrics::Label;

use crate::observability::metrics::MetricsRegistry;

pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";
pub const HTTP_REQUEST_DURATION: &str = "http_request_duration";

/// Route label for requests that matched no route.
const UNMATCHED_ROUTE: &str = "unmatched";

#[derive(Clone)]
pub struct HttpMetrics {
    registry: Arc<MetricsRegistry>,
}

impl HttpMetrics {
    pub fn new(registry: Arc<MetricsRegistry>) -> Self {
        registry.describe_counter(
            HTTP_REQUESTS_TOTAL,
            "The count of inbound HTTP requests, grouped by method, route, and status code",
        );
        registry.describe_histogram(
            HTTP_REQUEST_DURATION,
            "The duration in milliseconds of inbound HTTP requests, grouped by method, route, and status code",
        );
        Self { registry }
    }

    pub fn record(&self, method: &Method, route: &str, status: StatusCode, elapsed: Duration) {
        let labels = || {
            vec![
                Label::new("method", method.to_string()),
                Label::new("route", route.to_string()),
                Label::new("status_code", status.as_u16().to_string()),
            ]
        };
        self.registry
            .counter(HTTP_REQUESTS_TOTAL, labels())
            .increment(1);
        self.registry
            .histogram(HTTP_REQUEST_DURATION, labels())
            .record(elapsed.as_nanos() as f64 / 1_000_000.0);
    }
}

/// Middleware function recording every request that reaches a route.
pub async fn track_requests(
    State(metrics): State<HttpMetrics>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_owned())
        .unwrap_or_else(|| UNMATCHED_ROUTE.to_owned());

    let response = next.run(request).await;

    metrics.record(&method, &route, response.status(), start.elapsed());
    response
}
