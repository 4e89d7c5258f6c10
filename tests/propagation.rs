//! Trace context carried from the epoch client to the epoch server.

use std::sync::Arc;
use std::time::Duration;

use opentelemetry::trace::{SpanId, SpanKind, TracerProvider as _};
use opentelemetry_sdk::trace::{InMemorySpanExporter, SdkTracerProvider, SpanData};
use telemetry_pipeline::config::{CallerConfig, ServerConfig};
use telemetry_pipeline::http::handlers::epoch_router;
use telemetry_pipeline::http::middleware::HttpMetrics;
use telemetry_pipeline::http::HttpServer;
use telemetry_pipeline::lifecycle::Shutdown;
use telemetry_pipeline::observability::metrics::MetricsRegistry;
use telemetry_pipeline::pipeline::{
    EndpointCaller, JitterGenerator, JitterRange, OutcomeRecorder, StatusLabel,
};
use tokio::net::TcpListener;
use tracing_subscriber::layer::SubscriberExt;

mod common;

fn capture() -> (InMemorySpanExporter, tracing::subscriber::DefaultGuard) {
    let exporter = InMemorySpanExporter::default();
    let provider = SdkTracerProvider::builder()
        .with_simple_exporter(exporter.clone())
        .build();
    let subscriber = tracing_subscriber::registry()
        .with(tracing_opentelemetry::layer().with_tracer(provider.tracer("test")));
    (exporter, tracing::subscriber::set_default(subscriber))
}

async fn start_epoch_server(shutdown: &Shutdown) -> std::net::SocketAddr {
    let metrics = Arc::new(MetricsRegistry::new("example", "server", &[]).unwrap());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(
        epoch_router(JitterGenerator::new(JitterRange::new(1, 3))),
        HttpMetrics::new(metrics),
        &ServerConfig::default(),
    );
    tokio::spawn(server.run(listener, shutdown.subscribe()));
    addr
}

fn finished(exporter: &InMemorySpanExporter, name: &str) -> Vec<SpanData> {
    exporter
        .get_finished_spans()
        .unwrap()
        .into_iter()
        .filter(|span| span.name == name)
        .collect()
}

#[tokio::test]
async fn test_call_and_epoch_share_one_trace() {
    let (exporter, _guard) = capture();
    let shutdown = Shutdown::new();
    let addr = start_epoch_server(&shutdown).await;

    let metrics = Arc::new(MetricsRegistry::new("example", "client", &[]).unwrap());
    let config = CallerConfig {
        endpoint: format!("http://{}/epoch", addr),
        ..CallerConfig::default()
    };
    let caller = EndpointCaller::new(
        &config,
        Arc::new(OutcomeRecorder::new(metrics)),
        JitterGenerator::new(JitterRange::new(1, 2)),
    )
    .unwrap();

    let mut signal = shutdown.subscribe();
    let outcome = caller.call(0, &mut signal).await;
    assert_eq!(outcome.status, StatusLabel::Code(200));

    assert!(
        common::wait_until(Duration::from_secs(2), || {
            !finished(&exporter, "http_request").is_empty()
        })
        .await
    );

    let call = finished(&exporter, "call_epoch_api").remove(0);
    let request = finished(&exporter, "http_request").remove(0);
    let epoch = finished(&exporter, "epochTime").remove(0);

    assert_eq!(call.span_kind, SpanKind::Client);
    assert_eq!(request.span_kind, SpanKind::Server);
    assert_eq!(request.span_context.trace_id(), call.span_context.trace_id());
    assert_eq!(request.parent_span_id, call.span_context.span_id());
    assert_eq!(epoch.span_context.trace_id(), call.span_context.trace_id());
    assert_eq!(epoch.parent_span_id, request.span_context.span_id());

    shutdown.trigger();
}

#[tokio::test]
async fn test_request_without_context_starts_a_trace() {
    let (exporter, _guard) = capture();
    let shutdown = Shutdown::new();
    let addr = start_epoch_server(&shutdown).await;

    let res = reqwest::get(format!("http://{}/epoch", addr)).await.unwrap();
    assert_eq!(res.status(), 200);

    assert!(
        common::wait_until(Duration::from_secs(2), || {
            !finished(&exporter, "http_request").is_empty()
        })
        .await
    );
    let request = finished(&exporter, "http_request").remove(0);
    assert_eq!(request.parent_span_id, SpanId::INVALID);

    shutdown.trigger();
}
