// In-memory transports for examples and testing
//
// These never touch the network, which makes them suitable for:
// - Unit and integration tests of the runner and reporter
// - Dry runs of the CLI without a data service

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::error::TransportError;
use crate::query::RequestParameters;
use crate::transport::{QueryTransport, TransportResponse};

// ============================================================================
// StaticTransport - Answers every request with the same response
// ============================================================================

/// Transport that returns a fixed response, optionally after a delay
#[derive(Debug, Clone)]
pub struct StaticTransport {
    response: TransportResponse,
    delay: Option<Duration>,
    calls: Arc<AtomicU64>,
}

impl StaticTransport {
    pub fn new(response: TransportResponse) -> Self {
        Self {
            response,
            delay: None,
            calls: Arc::new(AtomicU64::new(0)),
        }
    }

    /// 200 response whose `data` array holds `rows` empty objects
    pub fn with_rows(rows: usize) -> Self {
        let data = vec![serde_json::json!({}); rows];
        let body = serde_json::json!({ "data": data }).to_string();
        Self::new(TransportResponse::new(200, body))
    }

    /// Sleep before answering each request
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of requests answered so far
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QueryTransport for StaticTransport {
    async fn send(
        &self,
        _params: &RequestParameters,
    ) -> Result<TransportResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.response.clone())
    }
}

// ============================================================================
// FailingTransport - Fails every request below the HTTP level
// ============================================================================

/// Transport that returns the same transport error for every request
#[derive(Debug, Clone)]
pub struct FailingTransport {
    error: TransportError,
}

impl FailingTransport {
    pub fn new(error: TransportError) -> Self {
        Self { error }
    }

    /// Simulates a server that is not listening
    pub fn connection_refused() -> Self {
        Self::new(TransportError::connection(
            "error sending request: Connection refused (os error 111)",
        ))
    }
}

#[async_trait]
impl QueryTransport for FailingTransport {
    async fn send(
        &self,
        _params: &RequestParameters,
    ) -> Result<TransportResponse, TransportError> {
        Err(self.error.clone())
    }
}
