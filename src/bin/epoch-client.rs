//! Epoch client.
//!
//! Runs `CONCURRENCY` execution units, each calling the epoch server in a
//! loop until interrupted. Every call is traced and recorded.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use telemetry_pipeline::config::{loader, ServiceConfig};
use telemetry_pipeline::lifecycle::signals;
use telemetry_pipeline::pipeline::{
    CallerPool, EndpointCaller, JitterGenerator, JitterRange, OutcomeRecorder,
};
use telemetry_pipeline::{Shutdown, Telemetry};

#[derive(Parser)]
#[command(name = "epoch-client")]
#[command(about = "Calls the epoch server from a pool of concurrent units", long_about = None)]
struct Cli {
    /// Optional TOML file layered over the built-in defaults.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let loaded = loader::load(ServiceConfig::client(), cli.config.as_deref())?;
    let config = &loaded.config;

    let shutdown = Arc::new(Shutdown::new());
    let telemetry = Telemetry::init(config, &shutdown).await?;
    loaded.report_rejected_env();
    let interrupt = signals::listen_for_interrupt(shutdown.clone());

    tracing::info!(
        endpoint = %config.caller.endpoint,
        concurrency = config.caller.concurrency,
        timeout_ms = config.caller.timeout_ms,
        "Configuration loaded"
    );

    let recorder = Arc::new(OutcomeRecorder::new(telemetry.metrics()));
    let jitter = JitterGenerator::new(JitterRange::new(
        config.caller.delay_low_ms,
        config.caller.delay_high_ms,
    ));
    let caller = Arc::new(EndpointCaller::new(&config.caller, recorder, jitter)?);

    let pool = CallerPool::launch(caller, config.caller.concurrency, &shutdown);
    tracing::info!("Client has started");

    let report = pool.join().await;
    tracing::info!(
        units = report.units.len(),
        attempts = report.total_attempts(),
        "Caller pool stopped"
    );

    interrupt.abort();
    telemetry.shutdown().await;

    tracing::info!("Shutdown complete");
    Ok(())
}
