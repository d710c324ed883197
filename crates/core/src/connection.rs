// Connectivity probe
//
// Checks `/health` and then runs one small sample query against the target
// table. A health endpoint that answers with a non-200 status is only a
// warning; an unreachable server or an unreadable health body stops the check.

use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::config::{LoadTestConfig, ServerEntry};
use crate::error::Result;
use crate::query::{LikeMatch, QueryCategory, QueryCondition, QueryField, RequestParameters};
use crate::runner::{row_count, SUCCESS_STATUS};
use crate::transport::{HttpTransport, QueryTransport};

/// Longest response excerpt kept for a failed sample query
const BODY_EXCERPT_LEN: usize = 200;

/// Fields reported by the data service health endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthInfo {
    pub status: String,
    pub database: String,
    pub environment: String,
}

impl HealthInfo {
    /// Fields missing from the JSON body read as `unknown`
    fn from_body(body: &str) -> std::result::Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(body)?;
        let field = |name: &str| {
            value
                .get(name)
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string()
        };
        Ok(Self {
            status: field("status"),
            database: field("database"),
            environment: field("environment"),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum HealthCheck {
    Healthy(HealthInfo),
    /// Server answered, but not with 200
    UnexpectedStatus { status: u16 },
    /// 200 whose body is not JSON
    InvalidBody { error: String },
    Unreachable { error: String },
}

impl HealthCheck {
    /// Whether the sample query should still be attempted
    fn allows_sample_query(&self) -> bool {
        matches!(
            self,
            HealthCheck::Healthy(_) | HealthCheck::UnexpectedStatus { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum SampleQueryCheck {
    Passed { rows: usize, table_name: String },
    Failed { status: Option<u16>, detail: String },
    /// Not attempted because the health check failed
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionReport {
    pub server: ServerEntry,
    pub endpoint: String,
    pub health: HealthCheck,
    pub sample_query: SampleQueryCheck,
}

impl ConnectionReport {
    pub fn is_success(&self) -> bool {
        matches!(self.sample_query, SampleQueryCheck::Passed { .. })
    }
}

/// The fixed query used to prove the data endpoint answers
pub fn sample_parameters() -> RequestParameters {
    RequestParameters {
        page: 1,
        limit: 5,
        search: QueryCondition::Like(LikeMatch::contains(QueryField::Department, "技术")),
        category: QueryCategory::Simple,
    }
}

/// Probe `server`: health first, then one sample query
pub async fn check_connection(
    server: &ServerEntry,
    config: &LoadTestConfig,
) -> Result<ConnectionReport> {
    let transport =
        HttpTransport::new(&server.base_url, config)?.with_timeout(config.timeouts.check());
    let endpoint = transport.endpoint();

    info!(server = %server.name, base_url = %server.base_url, "Checking connection");

    let health = match transport.health(config.timeouts.health()).await {
        Ok(response) if response.status == SUCCESS_STATUS => {
            match HealthInfo::from_body(&response.body) {
                Ok(info) => HealthCheck::Healthy(info),
                Err(e) => {
                    warn!(error = %e, "Health check returned an unreadable body");
                    HealthCheck::InvalidBody {
                        error: e.to_string(),
                    }
                }
            }
        }
        Ok(response) => {
            warn!(status = response.status, "Health check returned unexpected status");
            HealthCheck::UnexpectedStatus {
                status: response.status,
            }
        }
        Err(e) => {
            warn!(error = %e, "Health check failed");
            HealthCheck::Unreachable {
                error: e.to_string(),
            }
        }
    };

    let sample_query = if health.allows_sample_query() {
        run_sample_query(&transport).await
    } else {
        SampleQueryCheck::Skipped
    };

    Ok(ConnectionReport {
        server: server.clone(),
        endpoint,
        health,
        sample_query,
    })
}

async fn run_sample_query(transport: &HttpTransport) -> SampleQueryCheck {
    match transport.send(&sample_parameters()).await {
        Ok(response) if response.status == SUCCESS_STATUS => {
            match serde_json::from_str::<Value>(&response.body) {
                Ok(body) => SampleQueryCheck::Passed {
                    rows: row_count(&body),
                    table_name: body
                        .pointer("/tableInfo/tableName")
                        .and_then(Value::as_str)
                        .unwrap_or("unknown")
                        .to_string(),
                },
                Err(e) => SampleQueryCheck::Failed {
                    status: Some(response.status),
                    detail: format!("invalid JSON body: {}", e),
                },
            }
        }
        Ok(response) => SampleQueryCheck::Failed {
            status: Some(response.status),
            detail: excerpt(&response.body),
        },
        Err(e) => SampleQueryCheck::Failed {
            status: None,
            detail: e.to_string(),
        },
    }
}

fn excerpt(body: &str) -> String {
    body.chars().take(BODY_EXCERPT_LEN).collect()
}
