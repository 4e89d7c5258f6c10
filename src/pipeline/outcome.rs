//! Per-call outcome aggregation.
//!
//! Every call attempt produces one `Outcome`, folded immediately into two
//! partitioned instruments:
//! - `<ns>_<svc>_total_api_calls` (counter)
//! - `<ns>_<svc>_api_call_duration` (histogram, milliseconds)
//!
//! both labelled by `unit_id`, `status_code` and `is_error`.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use metrics::Label;

use crate::observability::metrics::MetricsRegistry;

pub const TOTAL_CALLS: &str = "total_api_calls";
pub const CALL_DURATION: &str = "api_call_duration";

/// Status label for calls that never produced a response.
pub const STATUS_NOT_AVAILABLE: &str = "n/a";

/// Status classification of one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLabel {
    /// A response arrived with this status code.
    Code(u16),
    /// Request construction or transport failed.
    NotAvailable,
}

impl fmt::Display for StatusLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusLabel::Code(code) => write!(f, "{}", code),
            StatusLabel::NotAvailable => f.write_str(STATUS_NOT_AVAILABLE),
        }
    }
}

/// Result of one call attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub unit_id: usize,
    pub status: StatusLabel,
    pub is_error: bool,
    pub elapsed: Duration,
}

impl Outcome {
    fn labels(&self) -> Vec<Label> {
        vec![
            Label::new("unit_id", self.unit_id.to_string()),
            Label::new("status_code", self.status.to_string()),
            Label::new("is_error", self.is_error.to_string()),
        ]
    }
}

/// Folds outcomes into the shared registry.
pub struct OutcomeRecorder {
    metrics: Arc<MetricsRegistry>,
}

impl OutcomeRecorder {
    pub fn new(metrics: Arc<MetricsRegistry>) -> Self {
        metrics.describe_counter(
            TOTAL_CALLS,
            "The count of all calls to the API, grouped by unit id, status code, and whether the call failed",
        );
        metrics.describe_histogram(
            CALL_DURATION,
            "The duration in milliseconds of calls to the API, grouped by unit id, status code, and whether the call failed",
        );
        Self { metrics }
    }

    pub fn record(&self, outcome: &Outcome) {
        self.metrics
            .counter(TOTAL_CALLS, outcome.labels())
            .increment(1);
        self.metrics
            .histogram(CALL_DURATION, outcome.labels())
            .record(outcome.elapsed.as_nanos() as f64 / 1_000_000.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> Arc<MetricsRegistry> {
        Arc::new(MetricsRegistry::new("example", "client", &[1.0, 100.0, 1000.0]).unwrap())
    }

    fn sample(rendered: &str, series: &str) -> Option<f64> {
        rendered
            .lines()
            .find_map(|line| line.strip_prefix(series)?.trim().parse().ok())
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(StatusLabel::Code(200).to_string(), "200");
        assert_eq!(StatusLabel::Code(503).to_string(), "503");
        assert_eq!(StatusLabel::NotAvailable.to_string(), "n/a");
    }

    #[test]
    fn test_record_partitions_by_label_triple() {
        let metrics = registry();
        let recorder = OutcomeRecorder::new(metrics.clone());

        let ok = Outcome {
            unit_id: 0,
            status: StatusLabel::Code(200),
            is_error: false,
            elapsed: Duration::from_millis(12),
        };
        recorder.record(&ok);
        recorder.record(&ok);
        recorder.record(&Outcome {
            unit_id: 1,
            status: StatusLabel::NotAvailable,
            is_error: true,
            elapsed: Duration::ZERO,
        });

        let rendered = metrics.render();
        assert_eq!(
            sample(
                &rendered,
                r#"example_client_total_api_calls{unit_id="0",status_code="200",is_error="false"}"#
            ),
            Some(2.0)
        );
        assert_eq!(
            sample(
                &rendered,
                r#"example_client_total_api_calls{unit_id="1",status_code="n/a",is_error="true"}"#
            ),
            Some(1.0)
        );
        assert_eq!(
            sample(
                &rendered,
                r#"example_client_api_call_duration_count{unit_id="0",status_code="200",is_error="false"}"#
            ),
            Some(2.0)
        );
        assert_eq!(
            sample(
                &rendered,
                r#"example_client_api_call_duration_sum{unit_id="0",status_code="200",is_error="false"}"#
            ),
            Some(24.0)
        );
    }

    #[test]
    fn test_concurrent_records_are_not_lost() {
        let metrics = registry();
        let recorder = Arc::new(OutcomeRecorder::new(metrics.clone()));

        std::thread::scope(|scope| {
            for unit_id in 0..8 {
                let recorder = recorder.clone();
                scope.spawn(move || {
                    for _ in 0..250 {
                        recorder.record(&Outcome {
                            unit_id: unit_id % 2,
                            status: StatusLabel::Code(503),
                            is_error: false,
                            elapsed: Duration::from_millis(1),
                        });
                    }
                });
            }
        });

        let rendered = metrics.render();
        for unit_id in 0..2 {
            let series = format!(
                r#"example_client_total_api_calls{{unit_id="{}",status_code="503",is_error="false"}}"#,
                unit_id
            );
            assert_eq!(sample(&rendered, &series), Some(1000.0));
        }
    }
}
