//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ServiceConfig;
use crate::config::validation::{validate_config, ValidationError};
use crate::observability::logging::parse_level;

/// Log verbosity override.
pub const LOG_LEVEL_ENV: &str = "LOG_LEVEL";

/// Caller pool size override.
pub const CONCURRENCY_ENV: &str = "CONCURRENCY";

/// OTLP collector endpoint. Setting it turns span export on.
pub const OTLP_ENDPOINT_ENV: &str = "OTEL_EXPORTER_OTLP_ENDPOINT";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// An environment value that was ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedEnv {
    pub key: &'static str,
    pub value: String,
    pub reason: String,
}

/// Effective configuration plus what the environment overlay rejected.
///
/// Rejections are kept rather than logged because loading runs before the
/// subscriber exists.
#[derive(Debug)]
pub struct LoadedConfig {
    pub config: ServiceConfig,
    pub rejected_env: Vec<RejectedEnv>,
}

impl LoadedConfig {
    /// Log every rejected environment value. Call once logging is up.
    pub fn report_rejected_env(&self) {
        for rejected in &self.rejected_env {
            tracing::warn!(
                key = rejected.key,
                value = %rejected.value,
                reason = %rejected.reason,
                "Ignoring unparseable {}",
                rejected.key
            );
        }
    }
}

/// Build the effective configuration for a service.
///
/// Layering order: `preset`, then the TOML file at `path` (if any), then the
/// process environment. The result is validated before it is returned.
pub fn load(preset: ServiceConfig, path: Option<&Path>) -> Result<LoadedConfig, ConfigError> {
    let mut config = match path {
        Some(path) => load_config(path, preset)?,
        None => preset,
    };
    let rejected_env = apply_env(&mut config, |key| std::env::var(key).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(LoadedConfig {
        config,
        rejected_env,
    })
}

/// Load a TOML file on top of `base`. Keys missing from the file keep the
/// value from `base`.
pub fn load_config(path: &Path, base: ServiceConfig) -> Result<ServiceConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    merge_toml(base, &content)
}

/// Merge TOML text on top of `base`.
pub fn merge_toml(base: ServiceConfig, content: &str) -> Result<ServiceConfig, ConfigError> {
    let overlay: toml::Value = toml::from_str(content)?;
    let mut merged = toml::Value::try_from(&base)?;
    merge_values(&mut merged, overlay);
    Ok(merged.try_into()?)
}

fn merge_values(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base), toml::Value::Table(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

/// Overlay `LOG_LEVEL`, `CONCURRENCY` and the OTLP endpoint.
///
/// Values that do not parse leave the current setting in place and are
/// returned.
pub fn apply_env<F>(config: &mut ServiceConfig, lookup: F) -> Vec<RejectedEnv>
where
    F: Fn(&str) -> Option<String>,
{
    let mut rejected = Vec::new();

    if let Some(raw) = lookup(LOG_LEVEL_ENV) {
        let level = raw.trim();
        if parse_level(level).is_some() {
            config.observability.log_level = level.to_string();
        } else {
            rejected.push(RejectedEnv {
                key: LOG_LEVEL_ENV,
                value: raw,
                reason: "not a level name or a number from -1 to 5".to_string(),
            });
        }
    }

    if let Some(raw) = lookup(CONCURRENCY_ENV) {
        match raw.trim().parse::<usize>() {
            Ok(concurrency) => config.caller.concurrency = concurrency,
            Err(e) => rejected.push(RejectedEnv {
                key: CONCURRENCY_ENV,
                value: raw,
                reason: e.to_string(),
            }),
        }
    }

    if let Some(raw) = lookup(OTLP_ENDPOINT_ENV) {
        let endpoint = raw.trim();
        if !endpoint.is_empty() {
            config.observability.otlp_endpoint = endpoint.to_string();
            config.observability.trace_export = true;
        }
    }

    rejected
}
