//! Epoch server.
//!
//! `GET /epoch` sleeps a random delay and answers with the Unix time.

use std::path::PathBuf;

use clap::Parser;
use telemetry_pipeline::config::{loader, ServiceConfig};
use telemetry_pipeline::http::handlers::epoch_router;
use telemetry_pipeline::http::middleware::HttpMetrics;
use telemetry_pipeline::lifecycle::{signals, startup};
use telemetry_pipeline::pipeline::{JitterGenerator, JitterRange};
use telemetry_pipeline::{HttpServer, Shutdown, Telemetry};

#[derive(Parser)]
#[command(name = "epoch-server")]
#[command(about = "Serves the current Unix time after a random delay", long_about = None)]
struct Cli {
    /// Optional TOML file layered over the built-in defaults.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let loaded = loader::load(ServiceConfig::epoch_server(), cli.config.as_deref())?;
    let config = &loaded.config;

    let shutdown = Shutdown::new();
    let telemetry = Telemetry::init(config, &shutdown).await?;
    loaded.report_rejected_env();

    let jitter = JitterGenerator::new(JitterRange::new(
        config.epoch.delay_low_ms,
        config.epoch.delay_high_ms,
    ));

    let listener = startup::bind(&config.server.bind_address).await?;
    let server = HttpServer::new(
        epoch_router(jitter),
        HttpMetrics::new(telemetry.metrics()),
        &config.server,
    );
    let server_task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    tracing::info!(bind_address = %config.server.bind_address, "Epoch server has started");
    signals::wait_for_interrupt().await;
    shutdown.trigger();

    match server_task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!(error = %e, "HTTP server failed"),
        Err(e) => tracing::error!(error = %e, "HTTP server task panicked"),
    }
    telemetry.shutdown().await;

    tracing::info!("Shutdown complete");
    Ok(())
}
