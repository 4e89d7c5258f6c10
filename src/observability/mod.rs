//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, histograms)
//!     → tracing.rs (span status, trace context propagation)
//!     → export.rs (tracer provider, optional OTLP exporter)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → /metrics endpoint (Prometheus scrape)
//!     → OTLP collector (when trace export is on)
//! ```
//!
//! # Design Decisions
//! - One metrics registry per process, passed explicitly
//! - Spans close when their last handle drops, so each is closed once
//! - Metric updates are atomic increments

pub mod export;
pub mod logging;
pub mod metrics;
pub mod tracing;
