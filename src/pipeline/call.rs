//! Single call unit.
//!
//! One attempt walks:
//!
//! ```text
//! Start → RequestBuilt → {TransportFailed | ResponseReceived}
//!       → {StatusRejected | StatusAccepted} → Recorded → PostDelay → End
//! ```
//!
//! The `call_epoch_api` span is opened at Start and closes when the attempt
//! returns, whichever branch it took. Its trace context rides on the request
//! as a `traceparent` header. Nothing is retried here; the caller
//! loop simply moves on to the next attempt.

use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::{field::Empty, Instrument, Span};

use crate::config::CallerConfig;
use crate::lifecycle::ShutdownSignal;
use crate::observability::tracing::{inject_context, record_error, set_error, set_ok};
use crate::pipeline::jitter::JitterGenerator;
use crate::pipeline::outcome::{Outcome, OutcomeRecorder, StatusLabel};

/// Why an attempt did not succeed.
#[derive(Debug, Error)]
pub enum CallError {
    #[error("error creating request: {0}")]
    RequestBuild(#[source] reqwest::Error),

    #[error("error calling server: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("unexpected status code: {0}")]
    UnexpectedStatus(StatusCode),
}

impl CallError {
    pub fn status_label(&self) -> StatusLabel {
        match self {
            CallError::RequestBuild(_) | CallError::Transport(_) => StatusLabel::NotAvailable,
            CallError::UnexpectedStatus(status) => StatusLabel::Code(status.as_u16()),
        }
    }

    /// A response with the wrong status is not an error: the call completed.
    pub fn is_error(&self) -> bool {
        !matches!(self, CallError::UnexpectedStatus(_))
    }

    fn span_message(&self) -> &'static str {
        match self {
            CallError::RequestBuild(_) => "error creating request",
            CallError::Transport(_) => "error calling server",
            CallError::UnexpectedStatus(_) => "unexpected status code",
        }
    }
}

/// Issues instrumented calls to one endpoint. Shared by every unit.
pub struct EndpointCaller {
    client: Client,
    endpoint: String,
    success: StatusCode,
    recorder: Arc<OutcomeRecorder>,
    jitter: JitterGenerator,
}

impl EndpointCaller {
    pub fn new(
        config: &CallerConfig,
        recorder: Arc<OutcomeRecorder>,
        jitter: JitterGenerator,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;
        let success = StatusCode::from_u16(config.success_status).unwrap_or(StatusCode::OK);

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            success,
            recorder,
            jitter,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Run one attempt for `unit_id`.
    ///
    /// The outcome is recorded before the post-call delay. The delay only
    /// follows a success and is cut short when `shutdown` fires.
    pub async fn call(&self, unit_id: usize, shutdown: &mut ShutdownSignal) -> Outcome {
        let span = tracing::info_span!(
            "call_epoch_api",
            otel.kind = "client",
            unit_id = unit_id,
            http.method = "GET",
            http.url = %self.endpoint,
            http.status_code = Empty,
            otel.status_code = Empty,
            otel.status_message = Empty,
            error = Empty,
        );

        let (result, elapsed) = self.exchange(&span).instrument(span.clone()).await;

        let outcome = match &result {
            Ok(status) => {
                span.record("http.status_code", status.as_u16());
                set_ok(&span);
                Outcome {
                    unit_id,
                    status: StatusLabel::Code(status.as_u16()),
                    is_error: false,
                    elapsed,
                }
            }
            Err(err) => {
                match err {
                    CallError::UnexpectedStatus(status) => {
                        span.record("http.status_code", status.as_u16());
                        set_error(&span, err.span_message());
                        span.in_scope(|| tracing::warn!(unit_id, status = %status, "Error response"));
                    }
                    _ => record_error(&span, err.span_message(), err),
                }
                Outcome {
                    unit_id,
                    status: err.status_label(),
                    is_error: err.is_error(),
                    elapsed,
                }
            }
        };

        self.recorder.record(&outcome);

        if result.is_ok() {
            let delay = self.jitter.draw(&span);
            tokio::select! {
                _ = tokio::time::sleep(delay).instrument(span.clone()) => {}
                _ = shutdown.cancelled() => {
                    span.in_scope(|| tracing::debug!(unit_id, "Post-call delay cut short by shutdown"));
                }
            }
        }

        outcome
    }

    /// Build and send the request carrying `span`'s trace context. Elapsed
    /// time covers the transport call only and is zero when the request
    /// could not be built.
    async fn exchange(&self, span: &Span) -> (Result<StatusCode, CallError>, Duration) {
        let mut request = match self.client.get(&self.endpoint).build() {
            Ok(request) => request,
            Err(e) => return (Err(CallError::RequestBuild(e)), Duration::ZERO),
        };
        inject_context(span, request.headers_mut());

        let start = Instant::now();
        let result = self.client.execute(request).await;
        let elapsed = start.elapsed();

        let status = match result {
            Ok(response) => response.status(),
            Err(e) => return (Err(CallError::Transport(e)), elapsed),
        };

        if status != self.success {
            return (Err(CallError::UnexpectedStatus(status)), elapsed);
        }
        (Ok(status), elapsed)
    }
}
