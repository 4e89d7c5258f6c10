//! Route handlers for the two inbound services.

use std::time::{SystemTime, UNIX_EPOCH};

use axum::{extract::State, http::StatusCode, routing::get, Router};
use tracing::{field::Empty, Instrument, Span};

use crate::observability::tracing::set_ok;
use crate::pipeline::handoff::HandoffSender;
use crate::pipeline::jitter::JitterGenerator;

pub const HELLO_BODY: &str = "Hello, World!";

#[derive(Clone)]
struct HelloState {
    queue: HandoffSender,
}

/// `GET /hello`: hand the request span to the background worker.
pub fn hello_router(queue: HandoffSender) -> Router {
    Router::new()
        .route("/hello", get(hello))
        .with_state(HelloState { queue })
}

async fn hello(State(state): State<HelloState>) -> (StatusCode, &'static str) {
    if let Err(e) = state.queue.push(Span::current()).await {
        tracing::warn!(error = %e, "Failed to hand off request context");
    }
    (StatusCode::OK, HELLO_BODY)
}

#[derive(Clone)]
struct EpochState {
    jitter: JitterGenerator,
}

/// `GET /epoch`: answer with the Unix time after a random delay.
pub fn epoch_router(jitter: JitterGenerator) -> Router {
    Router::new()
        .route("/epoch", get(epoch))
        .with_state(EpochState { jitter })
}

async fn epoch(State(state): State<EpochState>) -> String {
    epoch_time(&state.jitter).await.to_string()
}

/// Sleep for one draw of `jitter`, then return the Unix time in seconds.
pub async fn epoch_time(jitter: &JitterGenerator) -> u64 {
    let span = tracing::info_span!(
        "epochTime",
        otel.kind = "internal",
        otel.status_code = Empty,
        otel.status_message = Empty,
    );
    let delay = jitter.draw(&span);
    tokio::time::sleep(delay).instrument(span.clone()).await;
    set_ok(&span);

    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
