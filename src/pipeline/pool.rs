//! Concurrent caller pool.
//!
//! Launches N execution units. Each unit loops the single call unit until the
//! lifetime signal fires. The signal is checked between attempts only: an
//! in-flight call runs to completion (bounded by the client timeout) and is
//! recorded before the unit exits.

use std::sync::Arc;

use tokio::task::JoinSet;

use crate::lifecycle::{Shutdown, ShutdownSignal};
use crate::pipeline::call::EndpointCaller;

/// Per-unit summary returned when the unit exits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitReport {
    pub unit_id: usize,
    pub attempts: u64,
}

/// Summary of a stopped pool, ordered by unit id.
#[derive(Debug, Default)]
pub struct PoolReport {
    pub units: Vec<UnitReport>,
}

impl PoolReport {
    pub fn total_attempts(&self) -> u64 {
        self.units.iter().map(|unit| unit.attempts).sum()
    }
}

pub struct CallerPool;

impl CallerPool {
    /// Spawn `concurrency` units sharing `caller`.
    pub fn launch(caller: Arc<EndpointCaller>, concurrency: usize, shutdown: &Shutdown) -> PoolHandle {
        let mut tasks = JoinSet::new();
        for unit_id in 0..concurrency {
            tasks.spawn(run_unit(caller.clone(), unit_id, shutdown.subscribe()));
        }

        tracing::info!(
            units = concurrency,
            endpoint = %caller.endpoint(),
            "Caller pool launched"
        );
        PoolHandle {
            tasks,
            units: concurrency,
        }
    }
}

/// Running pool.
pub struct PoolHandle {
    tasks: JoinSet<UnitReport>,
    units: usize,
}

impl PoolHandle {
    pub fn units(&self) -> usize {
        self.units
    }

    /// Wait for every unit to exit. Only returns once the lifetime signal
    /// has fired.
    pub async fn join(mut self) -> PoolReport {
        let mut units = Vec::with_capacity(self.units);
        while let Some(joined) = self.tasks.join_next().await {
            match joined {
                Ok(report) => units.push(report),
                Err(e) => tracing::error!(error = %e, "Execution unit panicked"),
            }
        }
        units.sort_by_key(|unit| unit.unit_id);
        PoolReport { units }
    }
}

async fn run_unit(caller: Arc<EndpointCaller>, unit_id: usize, mut shutdown: ShutdownSignal) -> UnitReport {
    tracing::debug!(unit_id, "Execution unit started");
    let mut attempts = 0;

    while !shutdown.is_triggered() {
        caller.call(unit_id, &mut shutdown).await;
        attempts += 1;
        // Failed attempts loop without any delay.
        tokio::task::yield_now().await;
    }

    tracing::debug!(unit_id, attempts, "Execution unit stopped");
    UnitReport { unit_id, attempts }
}
