//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Wrap service routes with the shared middleware stack
//! - Bind the server to a listener
//! - Drain in-flight requests on shutdown
//!
//! Middleware order, outermost first:
//! request ID → request span → timeout → request ID echo → metrics → handler

use std::time::Duration;

use axum::{middleware, Router};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::ServerConfig;
use crate::http::middleware::{track_requests, HttpMetrics};
use crate::http::request::{
    make_request_span, propagate_request_id_layer, record_response, set_request_id_layer,
};
use crate::lifecycle::ShutdownSignal;

/// HTTP server for one service.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a server for `routes`.
    pub fn new(routes: Router, metrics: HttpMetrics, config: &ServerConfig) -> Self {
        Self {
            router: Self::build_router(routes, metrics, config),
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(routes: Router, metrics: HttpMetrics, config: &ServerConfig) -> Router {
        routes
            .layer(middleware::from_fn_with_state(metrics, track_requests))
            .layer(
                ServiceBuilder::new()
                    .layer(set_request_id_layer())
                    .layer(
                        TraceLayer::new_for_http()
                            .make_span_with(make_request_span)
                            .on_response(record_response),
                    )
                    .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs)))
                    .layer(propagate_request_id_layer()),
            )
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener, mut shutdown: ShutdownSignal) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
