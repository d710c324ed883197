// Integration tests for running batches end to end
//
// These tests drive LoadRunner with in-memory transports and check the
// aggregated statistics and the derived report.
//
// Run with: cargo test -p sheetload-core --test batch_test

use rand::rngs::StdRng;
use rand::SeedableRng;
use sheetload_core::memory::{FailingTransport, StaticTransport};
use sheetload_core::{
    AggregateStats, BatchReport, BatchSettings, LoadRunner, LoadTestConfig, ProgressListener,
    QueryCategory, QueryGenerator, QueryTransport, RequestOutcome, TransportResponse,
};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn runner(transport: Arc<dyn QueryTransport>) -> LoadRunner {
    LoadRunner::new(transport, QueryGenerator::default())
}

/// Records the counters seen after every fold
#[derive(Default)]
struct RecordingProgress {
    seen: Mutex<Vec<(u64, u64, u64)>>,
}

impl ProgressListener for RecordingProgress {
    fn on_outcome(&self, _outcome: &RequestOutcome, stats: &AggregateStats, _total: usize) {
        self.seen.lock().unwrap().push((
            stats.total_requests(),
            stats.success_requests(),
            stats.failed_requests(),
        ));
    }
}

#[tokio::test]
async fn test_all_successful_fast_batch() {
    let transport = Arc::new(StaticTransport::with_rows(10).with_delay(Duration::from_millis(5)));
    let runner = runner(transport.clone());
    let mut rng = StdRng::seed_from_u64(2024);
    let progress = RecordingProgress::default();

    let result = runner
        .run_batch(
            &BatchSettings::new(10, 100, QueryCategory::Simple),
            &mut rng,
            &progress,
        )
        .await
        .unwrap();

    let stats = &result.stats;
    assert_eq!(stats.total_requests(), 100);
    assert_eq!(stats.success_requests(), 100);
    assert_eq!(stats.failed_requests(), 0);
    assert_eq!(stats.rows_returned(), 1000);
    assert_eq!(stats.category_counts().get(&QueryCategory::Simple), Some(&100));
    assert_eq!(transport.calls(), 100);

    let config = LoadTestConfig::default();
    let report = BatchReport::build(&result, "mock", &config.thresholds);
    assert_eq!(report.success_rate, 100.0);
    assert_eq!(report.histogram[0].label, "0-100ms");
    assert_eq!(report.histogram[0].count, 100);
    assert_eq!(report.histogram.iter().map(|b| b.count).sum::<u64>(), 100);
    assert!(report.errors.is_empty());

    // progress observed every fold, counters consistent at each step
    let seen = progress.seen.lock().unwrap();
    assert_eq!(seen.len(), 100);
    for (i, (total, success, failed)) in seen.iter().enumerate() {
        assert_eq!(*total, i as u64 + 1);
        assert_eq!(success + failed, *total);
    }
}

#[tokio::test]
async fn test_connection_refused_batch() {
    let runner = runner(Arc::new(FailingTransport::connection_refused()));
    let mut rng = StdRng::seed_from_u64(7);

    let result = runner
        .run_batch(
            &BatchSettings::new(5, 20, QueryCategory::Complex),
            &mut rng,
            &sheetload_core::NoopProgress,
        )
        .await
        .unwrap();

    let stats = &result.stats;
    assert_eq!(stats.total_requests(), 20);
    assert_eq!(stats.failed_requests(), 20);
    assert_eq!(stats.success_requests(), 0);
    assert_eq!(stats.error_details().len(), 1);
    let (message, count) = stats.error_details().iter().next().unwrap();
    assert!(message.contains("Connection refused"));
    assert_eq!(*count, 20);

    let report = BatchReport::build(&result, "mock", &[]);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].percentage, 100.0);
    assert!(report.latency.is_none());
}

#[tokio::test]
async fn test_non_success_status_batch() {
    let transport = Arc::new(StaticTransport::new(TransportResponse::new(500, "boom")));
    let runner = runner(transport);
    let mut rng = StdRng::seed_from_u64(3);

    let result = runner
        .run_batch(
            &BatchSettings::new(3, 9, QueryCategory::Paginated),
            &mut rng,
            &sheetload_core::NoopProgress,
        )
        .await
        .unwrap();

    assert_eq!(result.stats.failed_requests(), 9);
    assert_eq!(result.stats.error_details().get("status: 500"), Some(&9));
}

#[tokio::test]
async fn test_unparseable_payload_batch_counts_success() {
    let transport = Arc::new(StaticTransport::new(TransportResponse::new(200, "not json")));
    let runner = runner(transport);
    let mut rng = StdRng::seed_from_u64(3);

    let result = runner
        .run_batch(
            &BatchSettings::new(2, 6, QueryCategory::Simple),
            &mut rng,
            &sheetload_core::NoopProgress,
        )
        .await
        .unwrap();

    assert_eq!(result.stats.success_requests(), 6);
    assert_eq!(result.stats.unparsed_payloads(), 6);
    assert_eq!(result.stats.rows_returned(), 0);
    assert!(result.stats.error_details().is_empty());
}

async fn mixed_breakdown(seed: u64) -> BTreeMap<QueryCategory, u64> {
    let runner = runner(Arc::new(StaticTransport::with_rows(1)));
    let mut rng = StdRng::seed_from_u64(seed);

    let result = runner
        .run_batch(
            &BatchSettings::new(30, 300, QueryCategory::Mixed),
            &mut rng,
            &sheetload_core::NoopProgress,
        )
        .await
        .unwrap();

    assert_eq!(result.stats.total_requests(), 300);
    result.stats.category_counts().clone()
}

#[tokio::test]
async fn test_mixed_batch_is_reproducible_with_seed() {
    let first = mixed_breakdown(12345).await;
    let second = mixed_breakdown(12345).await;

    assert_eq!(first, second);
    assert!(!first.contains_key(&QueryCategory::Mixed));
    assert_eq!(first.values().sum::<u64>(), 300);
    // all three concrete categories show up over 300 draws
    assert_eq!(first.len(), 3);
}

#[tokio::test]
async fn test_batches_do_not_share_statistics() {
    let runner = runner(Arc::new(StaticTransport::with_rows(2)));
    let mut rng = StdRng::seed_from_u64(9);
    let settings = BatchSettings::new(4, 12, QueryCategory::Simple);

    let first = runner
        .run_batch(&settings, &mut rng, &sheetload_core::NoopProgress)
        .await
        .unwrap();
    let second = runner
        .run_batch(&settings, &mut rng, &sheetload_core::NoopProgress)
        .await
        .unwrap();

    assert_eq!(first.stats.total_requests(), 12);
    assert_eq!(second.stats.total_requests(), 12);
}

#[tokio::test]
async fn test_single_request() {
    let runner = runner(Arc::new(StaticTransport::with_rows(4)));
    let mut rng = StdRng::seed_from_u64(1);

    let outcome = runner.execute_one(QueryCategory::Mixed, &mut rng).await;

    assert!(outcome.success);
    assert_eq!(outcome.result_count, 4);
    assert_ne!(outcome.category, QueryCategory::Mixed);
}
