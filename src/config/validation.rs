//! Configuration validation.
//!
//! Serde handles syntax; this module checks the values. Every error is
//! reported, not just the first one.

use std::net::SocketAddr;

use reqwest::Url;
use thiserror::Error;

use crate::config::schema::ServiceConfig;
use crate::observability::logging::parse_level;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("caller.endpoint `{0}` is not an http(s) URL")]
    InvalidEndpoint(String),

    #[error("caller.timeout_ms must be greater than zero")]
    ZeroTimeout,

    #[error("caller.success_status {0} is not a valid HTTP status")]
    InvalidStatus(u16),

    #[error("observability.log_level `{0}` is not a known level")]
    InvalidLogLevel(String),

    #[error("observability.otlp_endpoint `{0}` is not an http(s) URL")]
    InvalidOtlpEndpoint(String),

    #[error("{field} `{value}` is not a socket address")]
    InvalidAddress { field: &'static str, value: String },
}

/// Validate a fully merged configuration.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if !is_http_url(&config.caller.endpoint) {
        errors.push(ValidationError::InvalidEndpoint(config.caller.endpoint.clone()));
    }

    if config.caller.timeout_ms == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }

    if !(100..=599).contains(&config.caller.success_status) {
        errors.push(ValidationError::InvalidStatus(config.caller.success_status));
    }

    if parse_level(&config.observability.log_level).is_none() {
        errors.push(ValidationError::InvalidLogLevel(config.observability.log_level.clone()));
    }

    if config.observability.trace_export && !is_http_url(&config.observability.otlp_endpoint) {
        errors.push(ValidationError::InvalidOtlpEndpoint(
            config.observability.otlp_endpoint.clone(),
        ));
    }

    let addresses = [
        ("server.bind_address", &config.server.bind_address),
        ("observability.metrics_address", &config.observability.metrics_address),
    ];
    for (field, value) in addresses {
        if value.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::InvalidAddress {
                field,
                value: value.clone(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_http_url(raw: &str) -> bool {
    Url::parse(raw).is_ok_and(|url| matches!(url.scheme(), "http" | "https"))
}
