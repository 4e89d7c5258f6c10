//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! per-binary preset (ServiceConfig::client / epoch_server / handoff)
//!     → loader.rs (optional TOML file merged on top)
//!     → loader.rs (LOG_LEVEL / CONCURRENCY / OTLP endpoint from the environment)
//!     → validation.rs (semantic checks)
//!     → ServiceConfig (validated, immutable)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Unparseable environment values fall back to the current setting and are
//!   reported once logging is up

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{ConfigError, LoadedConfig, RejectedEnv};
pub use schema::{
    CallerConfig, EpochConfig, HandoffConfig, ObservabilityConfig, ServerConfig, ServiceConfig,
    ServiceIdentity,
};
