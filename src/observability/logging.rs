//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the `tracing` subscriber once per process
//! - Translate the configured level into an `EnvFilter`
//!
//! # Design Decisions
//! - `RUST_LOG` wins over the configured level when set
//! - The level filter applies to log output only; the OpenTelemetry layer
//!   sees every span at INFO and above regardless of the log level
//! - Pretty format for development, JSON for machine parsing
//! - Numeric levels follow the -1 (trace) .. 5 scale used by the deployment
//!   environment, so existing `LOG_LEVEL` values keep working

use std::str::FromStr;

use opentelemetry_sdk::trace::SdkTracer;
use serde::{Deserialize, Serialize};
use tracing::Level;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{
    layer::SubscriberExt, util::SubscriberInitExt, util::TryInitError, EnvFilter, Layer,
};

use crate::config::{ObservabilityConfig, ServiceIdentity};

/// Log line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Parse a level name or a numeric level.
///
/// Numeric levels: -1 trace, 0 debug, 1 info, 2 warn, 3..=5 error.
pub fn parse_level(raw: &str) -> Option<Level> {
    let raw = raw.trim();
    if let Ok(numeric) = raw.parse::<i8>() {
        return match numeric {
            -1 => Some(Level::TRACE),
            0 => Some(Level::DEBUG),
            1 => Some(Level::INFO),
            2 => Some(Level::WARN),
            3..=5 => Some(Level::ERROR),
            _ => None,
        };
    }
    Level::from_str(raw).ok()
}

/// Install the global subscriber: log output plus the OpenTelemetry layer
/// driven by `tracer`.
pub fn init_logging(
    service: &ServiceIdentity,
    config: &ObservabilityConfig,
    tracer: SdkTracer,
) -> Result<(), TryInitError> {
    let level = parse_level(&config.log_level).unwrap_or(Level::INFO);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));

    let output = match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt::layer().json().boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer().boxed(),
    };
    tracing_subscriber::registry()
        .with(output.with_filter(filter))
        .with(
            tracing_opentelemetry::layer()
                .with_tracer(tracer)
                .with_filter(LevelFilter::INFO),
        )
        .try_init()?;

    tracing::info!(
        service = %service.name,
        version = %service.version,
        environment = %service.environment,
        level = %level,
        "Logging initialized"
    );
    Ok(())
}
