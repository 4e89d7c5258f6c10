//! Inbound handoff pipeline.
//!
//! ```text
//! GET /hello ──push(span)──▶ HandoffQueue ──pull()──▶ HandoffWorker
//!   (blocks until accepted)   (rendezvous)          `concurrent worker` span
//!                                                     └─ `child worker` span
//! ```
//!
//! The queue is a rendezvous: `push` returns only once the consumer has taken
//! the context. It has exactly one consumer; `HandoffReceiver` is not
//! `Clone`, so a second consumer cannot be created. A push that arrives while
//! the consumer is busy waits until the consumer pulls again, so contexts are
//! processed strictly in arrival order.

use metrics::Counter;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{field::Empty, Instrument, Span};

use crate::lifecycle::ShutdownSignal;
use crate::observability::metrics::MetricsRegistry;
use crate::observability::tracing::set_ok;
use crate::pipeline::jitter::JitterGenerator;

pub const PROCESSED_TOTAL: &str = "handoff_processed_total";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HandoffError {
    #[error("handoff consumer is gone")]
    Closed,
}

struct Handoff {
    context: Span,
    accepted: oneshot::Sender<()>,
}

/// Create a queue with its single consumer.
pub fn channel() -> (HandoffSender, HandoffReceiver) {
    // One slot in the buffer plus the acceptance handshake gives rendezvous
    // semantics: no push completes before the matching pull.
    let (tx, rx) = mpsc::channel(1);
    (HandoffSender { tx }, HandoffReceiver { rx })
}

/// Producer side. Cheap to clone, one per request handler.
#[derive(Clone)]
pub struct HandoffSender {
    tx: mpsc::Sender<Handoff>,
}

impl HandoffSender {
    /// Hand `context` to the consumer and wait until it is accepted.
    pub async fn push(&self, context: Span) -> Result<(), HandoffError> {
        let (accepted, acceptance) = oneshot::channel();
        self.tx
            .send(Handoff { context, accepted })
            .await
            .map_err(|_| HandoffError::Closed)?;
        acceptance.await.map_err(|_| HandoffError::Closed)
    }
}

/// Consumer side.
pub struct HandoffReceiver {
    rx: mpsc::Receiver<Handoff>,
}

impl HandoffReceiver {
    /// Take the next context. `None` once every sender is gone. Cancel-safe.
    pub async fn pull(&mut self) -> Option<Span> {
        let handoff = self.rx.recv().await?;
        // The producer may have given up waiting; the context is still ours.
        let _ = handoff.accepted.send(());
        Some(handoff.context)
    }
}

/// Background consumer performing nested simulated work per context.
pub struct HandoffWorker {
    jitter: JitterGenerator,
    processed: Counter,
}

impl HandoffWorker {
    pub fn new(jitter: JitterGenerator, metrics: &MetricsRegistry) -> Self {
        metrics.describe_counter(PROCESSED_TOTAL, "The count of handed-off request contexts processed");
        Self {
            jitter,
            processed: metrics.counter(PROCESSED_TOTAL, vec![]),
        }
    }

    /// Consume until shutdown or until the queue closes. Returns the number
    /// of contexts processed. A context already pulled is always finished.
    pub async fn run(self, mut queue: HandoffReceiver, mut shutdown: ShutdownSignal) -> u64 {
        tracing::info!("Handoff worker started");
        let mut processed = 0;

        loop {
            let context = tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    tracing::info!("Handoff worker received shutdown signal, exiting loop");
                    break;
                }
                pulled = queue.pull() => match pulled {
                    Some(context) => context,
                    None => {
                        tracing::info!("Handoff queue closed, exiting loop");
                        break;
                    }
                },
            };

            self.process(context).await;
            processed += 1;
        }

        processed
    }

    /// Open `concurrent worker` under `context` and run the nested work.
    pub async fn process(&self, context: Span) {
        let span = tracing::info_span!(
            parent: &context,
            "concurrent worker",
            otel.kind = "internal",
            otel.status_code = Empty,
            otel.status_message = Empty,
        );
        span.in_scope(|| tracing::info!("starting concurrent worker"));

        self.sub_work(&span).instrument(span.clone()).await;

        set_ok(&span);
        self.processed.increment(1);
    }

    async fn sub_work(&self, parent: &Span) {
        let span = tracing::info_span!(
            parent: parent,
            "child worker",
            otel.kind = "internal",
            otel.status_code = Empty,
            otel.status_message = Empty,
        );
        span.in_scope(|| tracing::info!("starting sub worker"));

        let delay = self.jitter.draw(&span);
        tokio::time::sleep(delay).instrument(span.clone()).await;
        set_ok(&span);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_push_waits_for_pull() {
        let (sender, mut receiver) = channel();

        let producer = tokio::spawn(async move { sender.push(Span::none()).await });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!producer.is_finished(), "push must block while nobody pulls");

        assert!(receiver.pull().await.is_some());
        assert_eq!(producer.await.unwrap(), Ok(()));
    }

    #[tokio::test]
    async fn test_push_fails_without_consumer() {
        let (sender, receiver) = channel();
        drop(receiver);
        assert_eq!(sender.push(Span::none()).await, Err(HandoffError::Closed));
    }

    #[tokio::test]
    async fn test_push_waits_while_consumer_is_busy() {
        use crate::lifecycle::Shutdown;
        use crate::pipeline::jitter::JitterRange;
        use tokio::time::Instant;

        let metrics = MetricsRegistry::new("example", "test", &[]).unwrap();
        let worker = HandoffWorker::new(JitterGenerator::new(JitterRange::new(300, 300)), &metrics);
        let (sender, receiver) = channel();
        let shutdown = Shutdown::new();
        let running = tokio::spawn(worker.run(receiver, shutdown.subscribe()));

        let before = Instant::now();
        sender.push(Span::none()).await.unwrap();

        let second = sender.clone();
        let waiting = tokio::spawn(async move {
            second.push(Span::none()).await.unwrap();
            Instant::now()
        });
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!waiting.is_finished(), "second push must wait for the busy consumer");

        let accepted_at = waiting.await.unwrap();
        assert!(accepted_at - before >= Duration::from_millis(300));

        drop(sender);
        assert_eq!(running.await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_pull_ends_when_senders_drop() {
        let (sender, mut receiver) = channel();
        drop(sender);
        assert!(receiver.pull().await.is_none());
    }
}
