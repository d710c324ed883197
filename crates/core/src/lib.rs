// Load generation core for the Excel data service
//
// This crate generates randomized data queries, fires them concurrently at
// the `/api/data/{hash}` endpoint and reduces the outcomes into a report.
//
// Key design decisions:
// - The transport is a trait (QueryTransport) so batches can run against mocks
// - Randomness is passed in by the caller; seed a StdRng for reproducible runs
// - Each batch owns a fresh AggregateStats and returns it; nothing is global
// - A 200 with an unreadable body still counts as a success with zero rows

pub mod config;
pub mod connection;
pub mod error;
pub mod query;
pub mod report;
pub mod runner;
pub mod stats;
pub mod transport;

// In-memory transports for examples and testing
pub mod memory;

// Re-exports for convenience
pub use config::{LoadTestConfig, PerformanceTier, ServerEntry, ServerRegistry};
pub use connection::{check_connection, ConnectionReport, HealthCheck, SampleQueryCheck};
pub use error::{LoadTestError, Result, TransportError};
pub use query::{
    LikeMatch, QueryCategory, QueryCondition, QueryField, QueryGenerator, RequestParameters,
};
pub use report::{BatchReport, HistogramBucket, LatencySummary};
pub use runner::{BatchResult, BatchSettings, LoadRunner, NoopProgress, ProgressListener};
pub use stats::{AggregateStats, RequestOutcome};
pub use transport::{HttpTransport, QueryTransport, TransportResponse};
