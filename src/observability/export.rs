//! OTLP span export.
//!
//! Every process installs a tracer provider so spans carry W3C trace
//! context and can be propagated. An exporter is attached only when
//! `observability.trace_export` is set; otherwise finished spans are
//! dropped in-process.

use opentelemetry::trace::TracerProvider as _;
use opentelemetry::KeyValue;
use opentelemetry_otlp::{ExporterBuildError, SpanExporter, WithExportConfig};
use opentelemetry_sdk::trace::{SdkTracer, SdkTracerProvider};
use opentelemetry_sdk::Resource;
use thiserror::Error;

use crate::config::{ObservabilityConfig, ServiceIdentity};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to build OTLP span exporter: {0}")]
    Exporter(#[from] ExporterBuildError),
}

/// Tracer provider for one process.
pub struct TraceExport {
    provider: SdkTracerProvider,
    exporting: bool,
}

impl TraceExport {
    /// Build the provider. Must run inside the Tokio runtime when exporting.
    pub fn init(service: &ServiceIdentity, config: &ObservabilityConfig) -> Result<Self, ExportError> {
        let resource = Resource::builder()
            .with_service_name(service.name.clone())
            .with_attributes([
                KeyValue::new("service.namespace", service.namespace.clone()),
                KeyValue::new("service.version", service.version.clone()),
                KeyValue::new("deployment.environment", service.environment.clone()),
            ])
            .build();

        let mut builder = SdkTracerProvider::builder().with_resource(resource);
        if config.trace_export {
            let exporter = SpanExporter::builder()
                .with_tonic()
                .with_endpoint(config.otlp_endpoint.clone())
                .build()?;
            builder = builder.with_batch_exporter(exporter);
        }

        Ok(Self {
            provider: builder.build(),
            exporting: config.trace_export,
        })
    }

    pub fn tracer(&self) -> SdkTracer {
        self.provider.tracer(env!("CARGO_PKG_NAME"))
    }

    pub fn is_exporting(&self) -> bool {
        self.exporting
    }

    /// Flush pending spans and stop the exporter.
    pub async fn shutdown(self) {
        let provider = self.provider;
        match tokio::task::spawn_blocking(move || provider.shutdown()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!(error = %e, "Span exporter shutdown failed"),
            Err(e) => tracing::error!(error = %e, "Span exporter shutdown task panicked"),
        }
    }
}
