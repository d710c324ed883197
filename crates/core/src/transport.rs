// Transport seam between the runner and the data service
//
// The runner only needs "send these parameters, give me status + body".
// HttpTransport does that over reqwest; tests plug in in-memory transports.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::config::{AuthHeader, LoadTestConfig};
use crate::error::{Result, TransportError};
use crate::query::RequestParameters;

/// Raw response handed back to the runner for classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Sends one data query.
///
/// Implementations must not retry: every call is exactly one attempt.
#[async_trait]
pub trait QueryTransport: Send + Sync {
    async fn send(
        &self,
        params: &RequestParameters,
    ) -> std::result::Result<TransportResponse, TransportError>;
}

/// reqwest-backed transport for `GET {base_url}/api/data/{target_hash}`
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
    target_hash: String,
    auth: AuthHeader,
    timeout: Duration,
}

impl HttpTransport {
    /// Create a transport for `base_url` using the target, auth header and
    /// request timeout from `config`
    pub fn new(base_url: &str, config: &LoadTestConfig) -> Result<Self> {
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            target_hash: config.target_hash.clone(),
            auth: config.auth.clone(),
            timeout: config.timeouts.request(),
        })
    }

    /// Override the per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Full URL of the data-query endpoint
    pub fn endpoint(&self) -> String {
        format!("{}/api/data/{}", self.base_url, self.target_hash)
    }

    /// `GET {base_url}/health` without the auth header
    pub async fn health(
        &self,
        timeout: Duration,
    ) -> std::result::Result<TransportResponse, TransportError> {
        let url = format!("{}/health", self.base_url);
        let response = self.client.get(&url).timeout(timeout).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(TransportResponse { status, body })
    }
}

#[async_trait]
impl QueryTransport for HttpTransport {
    async fn send(
        &self,
        params: &RequestParameters,
    ) -> std::result::Result<TransportResponse, TransportError> {
        let response = self
            .client
            .get(self.endpoint())
            .query(&params.query_pairs()[..])
            .header(self.auth.name.as_str(), self.auth.value.as_str())
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(TransportResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{LikeMatch, QueryCategory, QueryCondition, QueryField};
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn params() -> RequestParameters {
        RequestParameters {
            page: 3,
            limit: 20,
            search: QueryCondition::Like(LikeMatch::contains(QueryField::Name, "王")),
            category: QueryCategory::Paginated,
        }
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let config = LoadTestConfig::default();
        let transport = HttpTransport::new("http://localhost:3000/", &config).unwrap();
        assert_eq!(
            transport.endpoint(),
            "http://localhost:3000/api/data/25295650f0cc6d4c6a18c39e77245406"
        );
        assert_eq!(transport.timeout(), Duration::from_secs(120));
    }

    #[tokio::test]
    async fn test_send_puts_parameters_on_the_wire() {
        let server = MockServer::start().await;
        let config = LoadTestConfig::default();

        Mock::given(method("GET"))
            .and(path(format!("/api/data/{}", config.target_hash)))
            .and(header("x-special-auth", config.auth.value.as_str()))
            .and(query_param("page", "3"))
            .and(query_param("limit", "20"))
            .and(query_param("search", r#"{"姓名":{"$like":"%王%"}}"#))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"data":[1,2]}"#))
            .expect(1)
            .mount(&server)
            .await;

        let transport = HttpTransport::new(&server.uri(), &config).unwrap();
        let response = transport.send(&params()).await.unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.body, r#"{"data":[1,2]}"#);
    }

    #[tokio::test]
    async fn test_send_reports_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let transport = HttpTransport::new(&server.uri(), &LoadTestConfig::default())
            .unwrap()
            .with_timeout(Duration::from_millis(50));
        let err = transport.send(&params()).await.unwrap_err();

        assert!(matches!(err, TransportError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_send_reports_connection_failure() {
        // Nothing listens on the discard port
        let transport =
            HttpTransport::new("http://127.0.0.1:9", &LoadTestConfig::default()).unwrap();
        let err = transport.send(&params()).await.unwrap_err();

        assert!(matches!(err, TransportError::Connection(_)));
        assert!(!err.to_string().is_empty());
    }
}
