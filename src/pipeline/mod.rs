//! Instrumented concurrent work pipeline.
//!
//! # Data Flow
//! ```text
//! Outbound (client):
//!     CallerPool ─┬─ unit 0 ─▶ EndpointCaller::call ─▶ OutcomeRecorder
//!                 ├─ unit 1 ─▶        ...                    │
//!                 └─ unit N ─▶        ...                    ▼
//!                                              MetricsRegistry (shared)
//!     success → JitterGenerator draw → sleep → next attempt
//!     failure → next attempt
//!
//! Inbound (handoff service):
//!     GET /hello → HandoffSender::push → HandoffWorker (single consumer)
//!                                          └─ concurrent worker → child worker
//! ```
//!
//! # Design Decisions
//! - Units share nothing but the recorder; they never talk to each other
//! - Cancellation is observed between attempts, never mid-call
//! - Every span closes when its last handle drops, on every exit path

pub mod call;
pub mod handoff;
pub mod jitter;
pub mod outcome;
pub mod pool;

pub use call::{CallError, EndpointCaller};
pub use handoff::{HandoffReceiver, HandoffSender, HandoffWorker};
pub use jitter::{JitterGenerator, JitterRange, LockedRng, RandomSource, ThreadLocalRng};
pub use outcome::{Outcome, OutcomeRecorder, StatusLabel};
pub use pool::{CallerPool, PoolHandle, PoolReport, UnitReport};
