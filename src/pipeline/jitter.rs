//! Jittered delay generation.
//!
//! A draw returns a uniformly distributed number of milliseconds in an
//! inclusive range and emits one short `randomize` span.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{field::Empty, Span};

use crate::observability::tracing::set_ok;

/// A thread-safe source of uniform integers.
pub trait RandomSource: Send + Sync {
    /// Uniform integer in `low..=high`. Callers guarantee `low <= high`.
    fn next_in_range(&self, low: u64, high: u64) -> u64;
}

/// A single generator shared behind a mutex held only for the draw.
#[derive(Debug)]
pub struct LockedRng {
    rng: Mutex<StdRng>,
}

impl LockedRng {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic sequence, for tests.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Default for LockedRng {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomSource for LockedRng {
    fn next_in_range(&self, low: u64, high: u64) -> u64 {
        // Poisoning leaves the generator state intact.
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        rng.gen_range(low..=high)
    }
}

/// Lock-free per-thread generator.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadLocalRng;

impl RandomSource for ThreadLocalRng {
    fn next_in_range(&self, low: u64, high: u64) -> u64 {
        fastrand::u64(low..=high)
    }
}

/// Inclusive millisecond range. Reversed bounds are swapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JitterRange {
    low_ms: u64,
    high_ms: u64,
}

impl JitterRange {
    pub fn new(low_ms: u64, high_ms: u64) -> Self {
        Self {
            low_ms: low_ms.min(high_ms),
            high_ms: low_ms.max(high_ms),
        }
    }

    pub fn low(&self) -> Duration {
        Duration::from_millis(self.low_ms)
    }

    pub fn high(&self) -> Duration {
        Duration::from_millis(self.high_ms)
    }

    pub fn contains(&self, delay: Duration) -> bool {
        delay >= self.low() && delay <= self.high()
    }
}

/// Draws delays from a `JitterRange`.
#[derive(Clone)]
pub struct JitterGenerator {
    range: JitterRange,
    source: Arc<dyn RandomSource>,
}

impl JitterGenerator {
    /// Generator backed by a `LockedRng`.
    pub fn new(range: JitterRange) -> Self {
        Self::with_source(range, Arc::new(LockedRng::new()))
    }

    pub fn with_source(range: JitterRange, source: Arc<dyn RandomSource>) -> Self {
        Self { range, source }
    }

    pub fn range(&self) -> JitterRange {
        self.range
    }

    /// Draw one delay under `parent`.
    pub fn draw(&self, parent: &Span) -> Duration {
        let span = tracing::info_span!(
            parent: parent,
            "randomize",
            otel.kind = "internal",
            delay_ms = Empty,
            otel.status_code = Empty,
            otel.status_message = Empty,
        );
        let millis = self
            .source
            .next_in_range(self.range.low_ms, self.range.high_ms);
        span.record("delay_ms", millis);
        set_ok(&span);
        Duration::from_millis(millis)
    }
}
