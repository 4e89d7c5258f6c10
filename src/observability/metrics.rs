//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Own the Prometheus recorder for one process
//! - Register label-partitioned counters and histograms on demand
//! - Expose the accumulated state on `GET /metrics`
//!
//! # Design Decisions
//! - The recorder is never installed globally; every instrument is reached
//!   through an explicitly constructed `MetricsRegistry`
//! - Metric names are `<namespace>_<service>_<name>`
//! - Partitions are append-only: handles resolve to the same atomic storage
//!   for the same name and labels, and nothing is ever removed

use std::sync::Arc;
use std::time::Duration;

use axum::{extract::State, routing::get, Router};
use metrics::{Counter, Histogram, Key, KeyName, Label, Level, Metadata, Recorder};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle, PrometheusRecorder};
use thiserror::Error;
use tokio::net::TcpListener;

use crate::lifecycle::ShutdownSignal;

static METADATA: Metadata<'static> =
    Metadata::new(module_path!(), Level::INFO, Some(module_path!()));

const UPKEEP_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("invalid histogram buckets: {0}")]
    Buckets(#[from] BuildError),
}

/// `count` bucket bounds starting at `start`, each `factor` times the last.
pub fn exponential_buckets(start: f64, factor: f64, count: usize) -> Vec<f64> {
    std::iter::successors(Some(start), |bound| Some(bound * factor))
        .take(count)
        .collect()
}

/// Registry of named instruments for one service.
pub struct MetricsRegistry {
    namespace: String,
    service: String,
    recorder: PrometheusRecorder,
    handle: PrometheusHandle,
}

impl MetricsRegistry {
    /// Create a registry. Histograms use `buckets_ms`; an empty slice falls
    /// back to the exporter's summaries.
    pub fn new(namespace: &str, service: &str, buckets_ms: &[f64]) -> Result<Self, MetricsError> {
        let mut builder = PrometheusBuilder::new();
        if !buckets_ms.is_empty() {
            builder = builder.set_buckets(buckets_ms)?;
        }
        let recorder = builder.build_recorder();
        let handle = recorder.handle();

        Ok(Self {
            namespace: namespace.to_string(),
            service: service.to_string(),
            recorder,
            handle,
        })
    }

    /// Fully qualified name for `name`.
    pub fn metric_name(&self, name: &str) -> String {
        format!("{}_{}_{}", self.namespace, self.service, name)
    }

    pub fn describe_counter(&self, name: &str, help: &'static str) {
        self.recorder
            .describe_counter(KeyName::from(self.metric_name(name)), None, help.into());
    }

    pub fn describe_histogram(&self, name: &str, help: &'static str) {
        self.recorder
            .describe_histogram(KeyName::from(self.metric_name(name)), None, help.into());
    }

    /// Counter partition for `labels`.
    pub fn counter(&self, name: &str, labels: Vec<Label>) -> Counter {
        let key = Key::from_parts(self.metric_name(name), labels);
        self.recorder.register_counter(&key, &METADATA)
    }

    /// Histogram partition for `labels`.
    pub fn histogram(&self, name: &str, labels: Vec<Label>) -> Histogram {
        let key = Key::from_parts(self.metric_name(name), labels);
        self.recorder.register_histogram(&key, &METADATA)
    }

    /// Current state in the Prometheus text format.
    pub fn render(&self) -> String {
        self.handle.render()
    }

    pub fn handle(&self) -> PrometheusHandle {
        self.handle.clone()
    }
}

/// Serve `GET /metrics` until shutdown.
pub async fn serve_metrics(
    listener: TcpListener,
    registry: Arc<MetricsRegistry>,
    shutdown: ShutdownSignal,
) -> std::io::Result<()> {
    let handle = registry.handle();

    let mut upkeep_shutdown = shutdown.clone();
    let upkeep_handle = handle.clone();
    let upkeep = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(UPKEEP_INTERVAL);
        loop {
            tokio::select! {
                _ = ticker.tick() => upkeep_handle.run_upkeep(),
                _ = upkeep_shutdown.cancelled() => break,
            }
        }
    });

    let app = Router::new()
        .route("/metrics", get(render_metrics))
        .with_state(handle);

    let mut shutdown = shutdown;
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await;

    upkeep.abort();
    tracing::info!("Metrics publisher stopped");
    served
}

async fn render_metrics(State(handle): State<PrometheusHandle>) -> String {
    handle.render()
}
