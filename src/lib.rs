//! Instrumented concurrent work pipeline.
//!
//! # Architecture Overview
//!
//! ```text
//!   epoch-client                         epoch-server
//!  ┌──────────────────────────┐         ┌──────────────────────────┐
//!  │ CallerPool (N units)     │  GET    │ GET /epoch               │
//!  │   └─ EndpointCaller ─────┼────────▶│   └─ epochTime span      │
//!  │        └─ OutcomeRecorder│ /epoch  │        └─ randomize span │
//!  └──────────┬───────────────┘         └──────────┬───────────────┘
//!             ▼                                    ▼
//!        :9092/metrics                        :9091/metrics
//!
//!   handoff-service
//!  ┌─────────────────────────────────────────────────────────────┐
//!  │ GET /hello ─push─▶ HandoffQueue ─pull─▶ HandoffWorker        │
//!  │                                          └─ concurrent worker│
//!  │                                               └─ child worker│
//!  └──────────────────────────────┬──────────────────────────────┘
//!                                 ▼
//!                            :9191/metrics
//! ```
//!
//! Cross-cutting: `config` (presets, TOML, environment), `observability`
//! (logging, metrics registry, span status), `lifecycle` (startup order,
//! signals, shutdown).

// Core
pub mod pipeline;

// Surfaces
pub mod http;

// Cross-cutting concerns
pub mod config;
pub mod lifecycle;
pub mod observability;

pub use config::ServiceConfig;
pub use http::HttpServer;
pub use lifecycle::{Shutdown, ShutdownSignal, Telemetry};
pub use observability::metrics::MetricsRegistry;
