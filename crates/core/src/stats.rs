// Per-request outcomes and per-batch aggregation

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::query::QueryCategory;

/// Advisory note attached to a 200 response whose body is not the expected JSON
pub const PAYLOAD_PARSE_NOTE: &str = "response body could not be parsed as JSON";

/// Advisory note attached to a 200 JSON response without the expected `data` array shape
pub const PAYLOAD_SHAPE_NOTE: &str = "response body has an unexpected shape";

/// Result of one executed request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestOutcome {
    pub success: bool,
    #[serde(rename = "elapsed_secs", serialize_with = "serialize_secs")]
    pub elapsed: Duration,
    /// Absent when the transport failed before a status was received
    pub status: Option<u16>,
    pub result_count: usize,
    pub category: QueryCategory,
    pub error: Option<String>,
    pub completed_at: DateTime<Utc>,
}

impl RequestOutcome {
    /// 200 response with a readable `data` array
    pub fn success(category: QueryCategory, elapsed: Duration, status: u16, rows: usize) -> Self {
        Self {
            success: true,
            elapsed,
            status: Some(status),
            result_count: rows,
            category,
            error: None,
            completed_at: Utc::now(),
        }
    }

    /// 200 response whose body could not be read. Still a success, with no rows.
    pub fn unparsed_payload(
        category: QueryCategory,
        elapsed: Duration,
        status: u16,
        note: impl Into<String>,
    ) -> Self {
        Self {
            success: true,
            elapsed,
            status: Some(status),
            result_count: 0,
            category,
            error: Some(note.into()),
            completed_at: Utc::now(),
        }
    }

    /// Response with a non-success status
    pub fn bad_status(category: QueryCategory, elapsed: Duration, status: u16) -> Self {
        Self {
            success: false,
            elapsed,
            status: Some(status),
            result_count: 0,
            category,
            error: Some(format!("status: {}", status)),
            completed_at: Utc::now(),
        }
    }

    /// No response at all (connection, timeout, DNS ...)
    pub fn transport_failure(
        category: QueryCategory,
        elapsed: Duration,
        error: impl Into<String>,
    ) -> Self {
        Self {
            success: false,
            elapsed,
            status: None,
            result_count: 0,
            category,
            error: Some(error.into()),
            completed_at: Utc::now(),
        }
    }
}

fn serialize_secs<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}

/// Statistics accumulated over one batch.
///
/// A fresh value is created for every batch and outcomes are folded in as
/// they complete. `success_requests + failed_requests == total_requests`
/// holds after every call to [`AggregateStats::record`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateStats {
    total_requests: u64,
    success_requests: u64,
    failed_requests: u64,
    /// Durations of successful requests, in completion order
    response_times: Vec<Duration>,
    error_details: BTreeMap<String, u64>,
    category_counts: BTreeMap<QueryCategory, u64>,
    unparsed_payloads: u64,
    rows_returned: u64,
}

impl AggregateStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one completed request into the totals
    pub fn record(&mut self, outcome: &RequestOutcome) {
        self.total_requests += 1;

        if outcome.success {
            self.success_requests += 1;
            self.response_times.push(outcome.elapsed);
            self.rows_returned += outcome.result_count as u64;
            if outcome.error.is_some() {
                self.unparsed_payloads += 1;
            }
        } else {
            self.failed_requests += 1;
            let reason = outcome
                .error
                .clone()
                .unwrap_or_else(|| "unknown".to_string());
            *self.error_details.entry(reason).or_insert(0) += 1;
        }

        *self.category_counts.entry(outcome.category).or_insert(0) += 1;
    }

    pub fn total_requests(&self) -> u64 {
        self.total_requests
    }

    pub fn success_requests(&self) -> u64 {
        self.success_requests
    }

    pub fn failed_requests(&self) -> u64 {
        self.failed_requests
    }

    pub fn response_times(&self) -> &[Duration] {
        &self.response_times
    }

    pub fn error_details(&self) -> &BTreeMap<String, u64> {
        &self.error_details
    }

    pub fn category_counts(&self) -> &BTreeMap<QueryCategory, u64> {
        &self.category_counts
    }

    /// Successful responses that carried an unreadable body
    pub fn unparsed_payloads(&self) -> u64 {
        self.unparsed_payloads
    }

    pub fn rows_returned(&self) -> u64 {
        self.rows_returned
    }

    /// Success rate in percent over the requests seen so far
    pub fn success_rate(&self) -> f64 {
        if self.total_requests == 0 {
            return 0.0;
        }
        self.success_requests as f64 / self.total_requests as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[test]
    fn test_stats_recording() {
        let mut stats = AggregateStats::new();

        stats.record(&RequestOutcome::success(QueryCategory::Simple, ms(40), 200, 10));
        stats.record(&RequestOutcome::bad_status(QueryCategory::Complex, ms(90), 500));
        stats.record(&RequestOutcome::transport_failure(
            QueryCategory::Simple,
            ms(5),
            "connection refused",
        ));

        assert_eq!(stats.total_requests(), 3);
        assert_eq!(stats.success_requests(), 1);
        assert_eq!(stats.failed_requests(), 2);
        assert_eq!(stats.response_times(), &[ms(40)]);
        assert_eq!(stats.rows_returned(), 10);
        assert_eq!(stats.error_details().get("status: 500"), Some(&1));
        assert_eq!(stats.error_details().get("connection refused"), Some(&1));
        assert_eq!(stats.category_counts().get(&QueryCategory::Simple), Some(&2));
        assert_eq!(stats.category_counts().get(&QueryCategory::Complex), Some(&1));
    }

    #[test]
    fn test_unparsed_payload_counts_as_success() {
        let mut stats = AggregateStats::new();
        stats.record(&RequestOutcome::unparsed_payload(
            QueryCategory::Paginated,
            ms(12),
            200,
            PAYLOAD_PARSE_NOTE,
        ));

        assert_eq!(stats.success_requests(), 1);
        assert_eq!(stats.failed_requests(), 0);
        assert_eq!(stats.unparsed_payloads(), 1);
        assert_eq!(stats.rows_returned(), 0);
        assert!(stats.error_details().is_empty());
    }

    #[test]
    fn test_counts_stay_consistent() {
        let mut stats = AggregateStats::new();
        for i in 0..50u64 {
            let outcome = if i % 3 == 0 {
                RequestOutcome::transport_failure(QueryCategory::Mixed, ms(i), "timeout")
            } else {
                RequestOutcome::success(QueryCategory::Simple, ms(i), 200, 1)
            };
            stats.record(&outcome);
            assert_eq!(
                stats.success_requests() + stats.failed_requests(),
                stats.total_requests()
            );
        }
        assert_eq!(stats.total_requests(), 50);
    }

    #[test]
    fn test_outcome_serializes_seconds() {
        let outcome = RequestOutcome::bad_status(QueryCategory::Simple, ms(1500), 404);
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["elapsed_secs"], 1.5);
        assert_eq!(value["error"], "status: 404");
        assert_eq!(value["category"], "simple");
    }

    #[test]
    fn test_success_rate_empty() {
        assert_eq!(AggregateStats::new().success_rate(), 0.0);
    }
}
