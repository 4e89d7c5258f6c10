//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure shared by the
//! three services. All types derive Serde traits for deserialization from
//! config files.

use serde::{Deserialize, Serialize};

use crate::observability::logging::LogFormat;

/// Root configuration for a pipeline service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// Identity attached to logs and metric names.
    pub service: ServiceIdentity,

    /// Logging and metrics exposition settings.
    pub observability: ObservabilityConfig,

    /// Inbound HTTP listener settings.
    pub server: ServerConfig,

    /// Outbound caller pool settings.
    pub caller: CallerConfig,

    /// Simulated work performed by the `/epoch` handler.
    pub epoch: EpochConfig,

    /// Simulated work performed by the handoff worker.
    pub handoff: HandoffConfig,
}

impl ServiceConfig {
    /// Defaults for the outbound caller pool binary.
    pub fn client() -> Self {
        let mut config = Self::default();
        config.service.name = "client".to_string();
        config.observability.log_level = "warn".to_string();
        config.observability.metrics_address = "0.0.0.0:9092".to_string();
        config
    }

    /// Defaults for the `/epoch` server binary.
    pub fn epoch_server() -> Self {
        let mut config = Self::default();
        config.service.name = "server".to_string();
        config.observability.log_level = "error".to_string();
        config.observability.metrics_address = "0.0.0.0:9091".to_string();
        config
    }

    /// Defaults for the `/hello` handoff binary.
    pub fn handoff() -> Self {
        let mut config = Self::default();
        config.service.name = "test".to_string();
        config.observability.log_level = "debug".to_string();
        config.observability.metrics_address = "0.0.0.0:9191".to_string();
        config
    }
}

/// Service identity.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceIdentity {
    /// Metric namespace prefix.
    pub namespace: String,

    /// Service name, second component of every metric name.
    pub name: String,

    pub version: String,

    pub environment: String,
}

impl Default for ServiceIdentity {
    fn default() -> Self {
        Self {
            namespace: "example".to_string(),
            name: "service".to_string(),
            version: "0.0.1".to_string(),
            environment: "local".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level: a name (trace, debug, info, warn, error) or a numeric
    /// level from -1 (trace) to 5.
    pub log_level: String,

    /// Log line format.
    pub log_format: LogFormat,

    /// Metrics endpoint bind address.
    pub metrics_address: String,

    /// Histogram bucket upper bounds, in milliseconds.
    pub histogram_buckets_ms: Vec<f64>,

    /// Export finished spans over OTLP/gRPC.
    pub trace_export: bool,

    /// OTLP collector endpoint, used when `trace_export` is set.
    pub otlp_endpoint: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::default(),
            metrics_address: "0.0.0.0:9090".to_string(),
            histogram_buckets_ms: crate::observability::metrics::exponential_buckets(5.0, 2.0, 12),
            trace_export: false,
            otlp_endpoint: "http://localhost:4317".to_string(),
        }
    }
}

/// Inbound listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Upper bound on the time spent serving one request.
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Outbound caller pool configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CallerConfig {
    /// Endpoint every execution unit calls with `GET`.
    pub endpoint: String,

    /// Number of concurrent execution units.
    pub concurrency: usize,

    /// Client-side timeout for one call.
    pub timeout_ms: u64,

    /// The only status code treated as success.
    pub success_status: u16,

    /// Lower bound of the delay after a successful call.
    pub delay_low_ms: u64,

    /// Upper bound of the delay after a successful call.
    pub delay_high_ms: u64,
}

impl Default for CallerConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://server:8080/epoch".to_string(),
            concurrency: 10,
            timeout_ms: 5000,
            success_status: 200,
            delay_low_ms: 500,
            delay_high_ms: 1500,
        }
    }
}

/// `/epoch` handler configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EpochConfig {
    pub delay_low_ms: u64,
    pub delay_high_ms: u64,
}

impl Default for EpochConfig {
    fn default() -> Self {
        Self {
            delay_low_ms: 500,
            delay_high_ms: 5000,
        }
    }
}

/// Handoff worker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HandoffConfig {
    /// Lower bound of the nested simulated work.
    pub work_low_ms: u64,

    /// Upper bound of the nested simulated work.
    pub work_high_ms: u64,
}

impl Default for HandoffConfig {
    fn default() -> Self {
        Self {
            work_low_ms: 10,
            work_high_ms: 200,
        }
    }
}
