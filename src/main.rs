//! Handoff service.
//!
//! `GET /hello` answers immediately and hands the request's span to a single
//! background worker, which performs nested simulated work under child spans.

use std::path::PathBuf;

use clap::Parser;
use telemetry_pipeline::config::{loader, ServiceConfig};
use telemetry_pipeline::http::handlers::hello_router;
use telemetry_pipeline::http::middleware::HttpMetrics;
use telemetry_pipeline::lifecycle::{signals, startup};
use telemetry_pipeline::pipeline::{handoff, HandoffWorker, JitterGenerator, JitterRange};
use telemetry_pipeline::{HttpServer, Shutdown, Telemetry};

#[derive(Parser)]
#[command(name = "handoff-service")]
#[command(about = "Hands inbound request contexts to a background worker", long_about = None)]
struct Cli {
    /// Optional TOML file layered over the built-in defaults.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let loaded = loader::load(ServiceConfig::handoff(), cli.config.as_deref())?;
    let config = &loaded.config;

    let shutdown = Shutdown::new();
    let telemetry = Telemetry::init(config, &shutdown).await?;
    loaded.report_rejected_env();

    tracing::info!(
        bind_address = %config.server.bind_address,
        work_low_ms = config.handoff.work_low_ms,
        work_high_ms = config.handoff.work_high_ms,
        "Configuration loaded"
    );

    let (queue, receiver) = handoff::channel();
    let jitter = JitterGenerator::new(JitterRange::new(
        config.handoff.work_low_ms,
        config.handoff.work_high_ms,
    ));
    let worker = HandoffWorker::new(jitter, &telemetry.metrics());
    let worker_task = tokio::spawn(worker.run(receiver, shutdown.subscribe()));

    let listener = startup::bind(&config.server.bind_address).await?;
    let server = HttpServer::new(
        hello_router(queue),
        HttpMetrics::new(telemetry.metrics()),
        &config.server,
    );
    let server_task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    tracing::info!("Handoff service has started");
    signals::wait_for_interrupt().await;
    shutdown.trigger();

    match server_task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!(error = %e, "HTTP server failed"),
        Err(e) => tracing::error!(error = %e, "HTTP server task panicked"),
    }
    match worker_task.await {
        Ok(processed) => tracing::info!(processed, "Handoff worker stopped"),
        Err(e) => tracing::error!(error = %e, "Handoff worker task panicked"),
    }
    telemetry.shutdown().await;

    tracing::info!("Shutdown complete");
    Ok(())
}
