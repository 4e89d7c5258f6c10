//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Logging → Metrics registry → Metrics publisher → Core
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Core tasks stop between iterations → Servers drain
//!     → Metrics publisher stops
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup; any failure before the core starts is fatal
//! - Ordered shutdown, reverse of startup

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::{Shutdown, ShutdownSignal};
pub use startup::{StartupError, Telemetry};
