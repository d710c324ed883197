// Load runner
//
// A batch generates every request up front from the caller's RNG, spawns one
// task per request on a JoinSet and gates them with a semaphore sized to the
// requested concurrency. The runner loop is the only writer of the batch
// statistics and folds outcomes in completion order.

use chrono::{DateTime, Utc};
use futures::FutureExt;
use rand::Rng;
use serde::Serialize;
use serde_json::Value;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::error::{LoadTestError, Result, TransportError};
use crate::query::{QueryCategory, QueryGenerator, RequestParameters};
use crate::stats::{AggregateStats, RequestOutcome, PAYLOAD_PARSE_NOTE, PAYLOAD_SHAPE_NOTE};
use crate::transport::{QueryTransport, TransportResponse};

/// HTTP status counted as success
pub const SUCCESS_STATUS: u16 = 200;

/// Shape of one batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BatchSettings {
    /// Maximum number of requests in flight
    pub concurrency: usize,
    pub total_requests: usize,
    pub category: QueryCategory,
}

impl BatchSettings {
    pub fn new(concurrency: usize, total_requests: usize, category: QueryCategory) -> Self {
        Self {
            concurrency,
            total_requests,
            category,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(LoadTestError::settings("concurrency must be at least 1"));
        }
        if self.total_requests == 0 {
            return Err(LoadTestError::settings("total requests must be at least 1"));
        }
        Ok(())
    }
}

/// Finalized statistics of a completed batch
#[derive(Debug, Clone)]
pub struct BatchResult {
    pub settings: BatchSettings,
    pub stats: AggregateStats,
    /// Wall-clock time from first submission to last completion
    pub elapsed: Duration,
    pub started_at: DateTime<Utc>,
}

/// Observer notified after each outcome is folded into the batch statistics
pub trait ProgressListener: Send + Sync {
    fn on_outcome(&self, outcome: &RequestOutcome, stats: &AggregateStats, total: usize);
}

/// Listener that ignores progress
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgress;

impl ProgressListener for NoopProgress {
    fn on_outcome(&self, _outcome: &RequestOutcome, _stats: &AggregateStats, _total: usize) {}
}

/// Executes batches of generated queries against a transport
#[derive(Clone)]
pub struct LoadRunner {
    transport: Arc<dyn QueryTransport>,
    generator: QueryGenerator,
}

impl LoadRunner {
    pub fn new(transport: Arc<dyn QueryTransport>, generator: QueryGenerator) -> Self {
        Self {
            transport,
            generator,
        }
    }

    pub fn generator(&self) -> &QueryGenerator {
        &self.generator
    }

    /// Generate and execute a single request
    pub async fn execute_one<R: Rng + ?Sized>(
        &self,
        category: QueryCategory,
        rng: &mut R,
    ) -> RequestOutcome {
        let params = self.generator.build(category, rng);
        execute(self.transport.as_ref(), params).await
    }

    /// Run one batch to completion.
    ///
    /// Every request produces exactly one outcome; there is no early exit
    /// and no retry. Statistics start empty for every call.
    pub async fn run_batch<R: Rng + ?Sized>(
        &self,
        settings: &BatchSettings,
        rng: &mut R,
        progress: &dyn ProgressListener,
    ) -> Result<BatchResult> {
        settings.validate()?;

        info!(
            concurrency = settings.concurrency,
            total_requests = settings.total_requests,
            category = %settings.category,
            "Starting batch"
        );

        let started_at = Utc::now();
        let start = Instant::now();
        let semaphore = Arc::new(Semaphore::new(settings.concurrency));
        let mut tasks = JoinSet::new();

        for _ in 0..settings.total_requests {
            let params = self.generator.build(settings.category, rng);
            let transport = Arc::clone(&self.transport);
            let semaphore = Arc::clone(&semaphore);

            tasks.spawn(async move {
                // Never closed, so the permit is always granted
                let _permit = semaphore.acquire_owned().await;
                let category = params.category;
                let started = Instant::now();
                match AssertUnwindSafe(execute(transport.as_ref(), params))
                    .catch_unwind()
                    .await
                {
                    Ok(outcome) => outcome,
                    Err(_) => RequestOutcome::transport_failure(
                        category,
                        started.elapsed(),
                        "request task panicked",
                    ),
                }
            });
        }

        let mut stats = AggregateStats::new();
        while let Some(joined) = tasks.join_next().await {
            let outcome = match joined {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(error = %e, "Request task did not complete");
                    RequestOutcome::transport_failure(settings.category, Duration::ZERO, e.to_string())
                }
            };

            stats.record(&outcome);
            progress.on_outcome(&outcome, &stats, settings.total_requests);
        }

        let elapsed = start.elapsed();
        info!(
            total = stats.total_requests(),
            success = stats.success_requests(),
            failed = stats.failed_requests(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Batch complete"
        );
        if stats.failed_requests() > 0 {
            warn!(
                failed = stats.failed_requests(),
                distinct_errors = stats.error_details().len(),
                "Batch finished with failed requests"
            );
        }

        Ok(BatchResult {
            settings: *settings,
            stats,
            elapsed,
            started_at,
        })
    }
}

/// Send one request and classify the result
async fn execute(transport: &dyn QueryTransport, params: RequestParameters) -> RequestOutcome {
    let start = Instant::now();
    let result = transport.send(&params).await;
    let elapsed = start.elapsed();

    let outcome = classify(params.category, elapsed, result);
    debug!(
        category = %outcome.category,
        success = outcome.success,
        status = ?outcome.status,
        rows = outcome.result_count,
        error = ?outcome.error,
        elapsed_ms = elapsed.as_millis() as u64,
        "Request completed"
    );
    outcome
}

/// Map a transport result onto an outcome.
///
/// A 200 response is a success even when its body is unreadable or has an
/// unexpected shape; the outcome then has zero rows and carries an advisory
/// note.
pub fn classify(
    category: QueryCategory,
    elapsed: Duration,
    result: std::result::Result<TransportResponse, TransportError>,
) -> RequestOutcome {
    match result {
        Ok(response) if response.status == SUCCESS_STATUS => {
            let status = response.status;
            match serde_json::from_str::<Value>(&response.body) {
                Ok(body) => match checked_row_count(&body) {
                    Some(rows) => RequestOutcome::success(category, elapsed, status, rows),
                    None => RequestOutcome::unparsed_payload(
                        category,
                        elapsed,
                        status,
                        PAYLOAD_SHAPE_NOTE,
                    ),
                },
                Err(_) => {
                    RequestOutcome::unparsed_payload(category, elapsed, status, PAYLOAD_PARSE_NOTE)
                }
            }
        }
        Ok(response) => RequestOutcome::bad_status(category, elapsed, response.status),
        Err(e) => RequestOutcome::transport_failure(category, elapsed, e.to_string()),
    }
}

/// Length of the `data` array, 0 when missing or not an array
pub fn row_count(body: &Value) -> usize {
    checked_row_count(body).unwrap_or(0)
}

/// Length of the `data` array. A missing `data` key is 0 rows; `None` when
/// the body is not an object or `data` is not an array.
pub fn checked_row_count(body: &Value) -> Option<usize> {
    let object = body.as_object()?;
    match object.get("data") {
        None => Some(0),
        Some(data) => data.as_array().map(Vec::len),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[test]
    fn test_classify_success_counts_rows() {
        let outcome = classify(
            QueryCategory::Simple,
            ms(20),
            Ok(TransportResponse::new(200, r#"{"data":[{},{},{}]}"#)),
        );
        assert!(outcome.success);
        assert_eq!(outcome.status, Some(200));
        assert_eq!(outcome.result_count, 3);
        assert!(outcome.error.is_none());
    }

    #[test]
    fn test_classify_missing_data_is_zero_rows() {
        let outcome = classify(
            QueryCategory::Simple,
            ms(20),
            Ok(TransportResponse::new(200, r#"{"total":0}"#)),
        );
        assert!(outcome.success);
        assert_eq!(outcome.result_count, 0);
        assert!(outcome.error.is_none());
    }

    #[test]
    fn test_classify_unparseable_body_is_success() {
        let outcome = classify(
            QueryCategory::Complex,
            ms(20),
            Ok(TransportResponse::new(200, "<html>gateway</html>")),
        );
        assert!(outcome.success);
        assert_eq!(outcome.result_count, 0);
        assert_eq!(outcome.error.as_deref(), Some(PAYLOAD_PARSE_NOTE));
    }

    #[test]
    fn test_classify_unexpected_shape_is_noted_success() {
        for body in ["[1,2,3]", r#"{"data":"abc"}"#, "42"] {
            let outcome = classify(
                QueryCategory::Simple,
                ms(1),
                Ok(TransportResponse::new(200, body)),
            );
            assert!(outcome.success, "body {}", body);
            assert_eq!(outcome.result_count, 0);
            assert_eq!(outcome.error.as_deref(), Some(PAYLOAD_SHAPE_NOTE));
        }
    }

    #[test]
    fn test_unexpected_shape_counts_as_unparsed_payload() {
        let mut stats = AggregateStats::new();
        stats.record(&classify(
            QueryCategory::Simple,
            ms(1),
            Ok(TransportResponse::new(200, r#"{"data":{"rows":1}}"#)),
        ));

        assert_eq!(stats.success_requests(), 1);
        assert_eq!(stats.unparsed_payloads(), 1);
        assert!(stats.error_details().is_empty());
    }

    #[test]
    fn test_checked_row_count() {
        assert_eq!(checked_row_count(&serde_json::json!({"data": [1, 2]})), Some(2));
        assert_eq!(checked_row_count(&serde_json::json!({})), Some(0));
        assert_eq!(checked_row_count(&serde_json::json!({"data": null})), None);
        assert_eq!(checked_row_count(&serde_json::json!([1])), None);
        assert_eq!(row_count(&serde_json::json!([1])), 0);
    }

    #[test]
    fn test_classify_bad_status() {
        let outcome = classify(
            QueryCategory::Complex,
            ms(20),
            Ok(TransportResponse::new(503, "busy")),
        );
        assert!(!outcome.success);
        assert_eq!(outcome.status, Some(503));
        assert_eq!(outcome.error.as_deref(), Some("status: 503"));
    }

    #[test]
    fn test_classify_transport_error() {
        let outcome = classify(
            QueryCategory::Paginated,
            ms(20),
            Err(TransportError::timeout("operation timed out")),
        );
        assert!(!outcome.success);
        assert_eq!(outcome.status, None);
        assert_eq!(outcome.error.as_deref(), Some("operation timed out"));
    }

    #[test]
    fn test_settings_validation() {
        assert!(BatchSettings::new(1, 1, QueryCategory::Simple).validate().is_ok());
        assert!(BatchSettings::new(0, 10, QueryCategory::Simple).validate().is_err());
        assert!(BatchSettings::new(10, 0, QueryCategory::Simple).validate().is_err());
    }

    /// Tracks the peak number of concurrent `send` calls
    struct GaugeTransport {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl QueryTransport for GaugeTransport {
        async fn send(
            &self,
            _params: &RequestParameters,
        ) -> std::result::Result<TransportResponse, TransportError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(ms(5)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(TransportResponse::new(200, r#"{"data":[]}"#))
        }
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let transport = Arc::new(GaugeTransport {
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let runner = LoadRunner::new(transport.clone(), QueryGenerator::default());
        let mut rng = StdRng::seed_from_u64(42);

        let result = runner
            .run_batch(
                &BatchSettings::new(4, 40, QueryCategory::Mixed),
                &mut rng,
                &NoopProgress,
            )
            .await
            .unwrap();

        assert_eq!(result.stats.total_requests(), 40);
        assert!(transport.peak.load(Ordering::SeqCst) <= 4);
        assert!(transport.peak.load(Ordering::SeqCst) >= 1);
    }

    struct PanickingTransport;

    #[async_trait]
    impl QueryTransport for PanickingTransport {
        async fn send(
            &self,
            _params: &RequestParameters,
        ) -> std::result::Result<TransportResponse, TransportError> {
            panic!("transport bug");
        }
    }

    #[tokio::test]
    async fn test_panicking_request_is_recorded_as_failure() {
        let runner = LoadRunner::new(Arc::new(PanickingTransport), QueryGenerator::default());
        let mut rng = StdRng::seed_from_u64(1);

        let result = runner
            .run_batch(
                &BatchSettings::new(2, 3, QueryCategory::Simple),
                &mut rng,
                &NoopProgress,
            )
            .await
            .unwrap();

        assert_eq!(result.stats.failed_requests(), 3);
        assert_eq!(
            result.stats.error_details().get("request task panicked"),
            Some(&3)
        );
    }

    #[tokio::test]
    async fn test_invalid_settings_rejected() {
        let runner = LoadRunner::new(Arc::new(PanickingTransport), QueryGenerator::default());
        let mut rng = StdRng::seed_from_u64(1);
        let err = runner
            .run_batch(
                &BatchSettings::new(0, 3, QueryCategory::Simple),
                &mut rng,
                &NoopProgress,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LoadTestError::InvalidSettings(_)));
    }
}
