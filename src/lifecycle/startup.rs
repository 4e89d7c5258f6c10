//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize the tracer provider, logging, metrics, then the metrics
//!   publisher
//! - Bind listeners
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal and no core logic runs
//! - Subsystems initialize in order, not concurrently
//! - Teardown runs in reverse order via `Telemetry::shutdown`

use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing_subscriber::util::TryInitError;

use crate::config::{ConfigError, ServiceConfig};
use crate::lifecycle::Shutdown;
use crate::observability::export::{ExportError, TraceExport};
use crate::observability::logging::init_logging;
use crate::observability::metrics::{serve_metrics, MetricsError, MetricsRegistry};

/// Bootstrap failures.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to load configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to initialize trace export: {0}")]
    Tracing(#[from] ExportError),

    #[error("failed to initialize logging: {0}")]
    Logging(#[from] TryInitError),

    #[error("failed to initialize metrics: {0}")]
    Metrics(#[from] MetricsError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

/// Bind a TCP listener, mapping failures to `StartupError::Bind`.
pub async fn bind(addr: &str) -> Result<TcpListener, StartupError> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| StartupError::Bind {
            addr: addr.to_string(),
            source,
        })
}

/// Process-wide telemetry handles created at startup.
pub struct Telemetry {
    traces: TraceExport,
    metrics: Arc<MetricsRegistry>,
    metrics_address: SocketAddr,
    publisher: JoinHandle<std::io::Result<()>>,
}

impl Telemetry {
    /// Full bootstrap: tracer provider, logging, metrics registry, metrics
    /// publisher.
    pub async fn init(config: &ServiceConfig, shutdown: &Shutdown) -> Result<Self, StartupError> {
        let traces = TraceExport::init(&config.service, &config.observability)?;
        init_logging(&config.service, &config.observability, traces.tracer())?;
        if traces.is_exporting() {
            tracing::info!(endpoint = %config.observability.otlp_endpoint, "Span export enabled");
        }

        let metrics = Arc::new(MetricsRegistry::new(
            &config.service.namespace,
            &config.service.name,
            &config.observability.histogram_buckets_ms,
        )?);

        let addr = &config.observability.metrics_address;
        let listener = bind(addr).await?;
        let metrics_address = listener.local_addr().map_err(|source| StartupError::Bind {
            addr: addr.clone(),
            source,
        })?;

        let publisher = tokio::spawn(serve_metrics(listener, metrics.clone(), shutdown.subscribe()));
        tracing::info!(address = %metrics_address, "Metrics published");

        Ok(Self {
            traces,
            metrics,
            metrics_address,
            publisher,
        })
    }

    pub fn metrics(&self) -> Arc<MetricsRegistry> {
        self.metrics.clone()
    }

    pub fn metrics_address(&self) -> SocketAddr {
        self.metrics_address
    }

    /// Wait for the publisher to stop, then flush spans. Call after the
    /// shutdown signal fired.
    pub async fn shutdown(self) {
        match self.publisher.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!(error = %e, "Metrics publisher failed"),
            Err(e) => tracing::error!(error = %e, "Metrics publisher task panicked"),
        }
        self.traces.shutdown().await;
    }
}
