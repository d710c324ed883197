// Load test configuration
//
// LoadTestConfig is a plain serde struct with built-in defaults that match the
// deployed data service. `from_env` layers environment overrides on top so the
// binary can target another table or credential without a rebuild.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{LoadTestError, Result};
use crate::query::QueryCategory;

/// Hash of the annual-leave balance table queried by default
pub const DEFAULT_TARGET_HASH: &str = "25295650f0cc6d4c6a18c39e77245406";

/// Header used by the data service to admit trusted tooling
pub const DEFAULT_AUTH_HEADER: &str = "x-special-auth";
pub const DEFAULT_AUTH_VALUE: &str = "czhmisakaLogin:aGithubUserFuckEverything";

pub const DEFAULT_SERVER: &str = "local";

/// Complete load test configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadTestConfig {
    pub servers: ServerRegistry,
    pub target_hash: String,
    pub auth: AuthHeader,
    pub vocabulary: Vocabulary,
    pub timeouts: Timeouts,
    /// Upper bound for the worker pool size
    pub max_workers: usize,
    pub defaults: BatchDefaults,
    pub thresholds: Vec<TierThreshold>,
}

impl Default for LoadTestConfig {
    fn default() -> Self {
        Self {
            servers: ServerRegistry::default(),
            target_hash: DEFAULT_TARGET_HASH.to_string(),
            auth: AuthHeader::default(),
            vocabulary: Vocabulary::default(),
            timeouts: Timeouts::default(),
            max_workers: 100,
            defaults: BatchDefaults::default(),
            thresholds: default_thresholds(),
        }
    }
}

impl LoadTestConfig {
    /// Build the default configuration with environment overrides applied.
    ///
    /// Recognised variables: `SHEETLOAD_TARGET_HASH`, `SHEETLOAD_AUTH_HEADER`,
    /// `SHEETLOAD_AUTH_VALUE`, `SHEETLOAD_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`LoadTestConfig::from_env`], reading variables through `lookup`
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(hash) = lookup("SHEETLOAD_TARGET_HASH") {
            config.target_hash = hash;
        }
        if let Some(name) = lookup("SHEETLOAD_AUTH_HEADER") {
            config.auth.name = name;
        }
        if let Some(value) = lookup("SHEETLOAD_AUTH_VALUE") {
            config.auth.value = value;
        }
        if let Some(secs) = lookup("SHEETLOAD_TIMEOUT_SECS") {
            config.timeouts.request_secs = secs.trim().parse().map_err(|_| {
                LoadTestError::config(format!("Invalid SHEETLOAD_TIMEOUT_SECS: {}", secs))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.target_hash.is_empty() {
            return Err(LoadTestError::config("target hash must not be empty"));
        }
        if self.max_workers == 0 {
            return Err(LoadTestError::config("max_workers must be at least 1"));
        }
        if self.timeouts.request_secs == 0 {
            return Err(LoadTestError::config("request timeout must be at least 1s"));
        }
        self.vocabulary.validate()
    }

    /// Clamp a requested worker count to `1..=max_workers`
    pub fn clamp_concurrency(&self, requested: usize) -> usize {
        if requested > self.max_workers {
            tracing::warn!(
                requested,
                max_workers = self.max_workers,
                "Concurrency above configured maximum, clamping"
            );
        }
        requested.clamp(1, self.max_workers)
    }
}

/// A named target environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerEntry {
    pub name: String,
    pub base_url: String,
    pub description: String,
}

/// Ordered name → base URL registry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServerRegistry {
    entries: Vec<ServerEntry>,
}

impl Default for ServerRegistry {
    fn default() -> Self {
        Self {
            entries: vec![
                ServerEntry {
                    name: "local".to_string(),
                    base_url: "http://localhost:3000".to_string(),
                    description: "Local development environment".to_string(),
                },
                ServerEntry {
                    name: "remote".to_string(),
                    base_url: "http://101.126.91.134:9000".to_string(),
                    description: "Remote server environment".to_string(),
                },
                ServerEntry {
                    name: "production".to_string(),
                    base_url: "https://api.example.com".to_string(),
                    description: "Production environment".to_string(),
                },
            ],
        }
    }
}

impl ServerRegistry {
    pub fn new(entries: Vec<ServerEntry>) -> Self {
        Self { entries }
    }

    pub fn get(&self, name: &str) -> Option<&ServerEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Look up a server, failing with the list of known names
    pub fn resolve(&self, name: &str) -> Result<&ServerEntry> {
        self.get(name).ok_or_else(|| LoadTestError::UnknownServer {
            name: name.to_string(),
            available: self.names().join(", "),
        })
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ServerEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthHeader {
    pub name: String,
    pub value: String,
}

impl Default for AuthHeader {
    fn default() -> Self {
        Self {
            name: DEFAULT_AUTH_HEADER.to_string(),
            value: DEFAULT_AUTH_VALUE.to_string(),
        }
    }
}

/// Field values the query generator draws from
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Vocabulary {
    pub departments: Vec<String>,
    /// Surname initials matched against the name column
    pub names: Vec<String>,
    /// Employee ids are drawn from `employee_id_start..employee_id_end`
    pub employee_id_start: u32,
    pub employee_id_end: u32,
    pub vacation_days: Vec<String>,
}

impl Default for Vocabulary {
    fn default() -> Self {
        let owned = |items: &[&str]| -> Vec<String> { items.iter().map(|s| s.to_string()).collect() };
        Self {
            departments: owned(&[
                "技术部", "销售部", "市场部", "人事部", "财务部", "研发部", "运营部", "客服部",
            ]),
            names: owned(&[
                "张", "李", "王", "刘", "陈", "杨", "赵", "黄", "周", "吴", "徐", "孙", "胡", "朱", "高",
                "林",
            ]),
            employee_id_start: 1000,
            employee_id_end: 2000,
            vacation_days: owned(&["5", "10", "15", "20", "25", "30"]),
        }
    }
}

impl Vocabulary {
    pub fn validate(&self) -> Result<()> {
        if self.departments.is_empty() || self.names.is_empty() || self.vacation_days.is_empty() {
            return Err(LoadTestError::config("vocabulary lists must not be empty"));
        }
        if self.employee_id_start >= self.employee_id_end {
            return Err(LoadTestError::config("employee id range is empty"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    /// Per-request timeout for load traffic
    pub request_secs: u64,
    /// Timeout for the `/health` probe
    pub health_secs: u64,
    /// Timeout for the connection-check sample query
    pub check_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            request_secs: 120,
            health_secs: 10,
            check_secs: 30,
        }
    }
}

impl Timeouts {
    pub fn request(&self) -> Duration {
        Duration::from_secs(self.request_secs)
    }

    pub fn health(&self) -> Duration {
        Duration::from_secs(self.health_secs)
    }

    pub fn check(&self) -> Duration {
        Duration::from_secs(self.check_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchDefaults {
    pub concurrency: usize,
    pub total_requests: usize,
    pub category: QueryCategory,
}

impl Default for BatchDefaults {
    fn default() -> Self {
        Self {
            concurrency: 10,
            total_requests: 100,
            category: QueryCategory::Mixed,
        }
    }
}

/// Informational performance grade. Never used as a pass/fail gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceTier {
    Excellent,
    Good,
    Acceptable,
    Poor,
    BelowPoor,
}

impl std::fmt::Display for PerformanceTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            PerformanceTier::Excellent => "excellent",
            PerformanceTier::Good => "good",
            PerformanceTier::Acceptable => "acceptable",
            PerformanceTier::Poor => "poor",
            PerformanceTier::BelowPoor => "below poor",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierThreshold {
    pub tier: PerformanceTier,
    /// Mean response time must not exceed this many seconds
    pub max_avg_response_secs: f64,
    /// Success rate (percent) must be at least this
    pub min_success_rate: f64,
}

fn default_thresholds() -> Vec<TierThreshold> {
    vec![
        TierThreshold {
            tier: PerformanceTier::Excellent,
            max_avg_response_secs: 0.1,
            min_success_rate: 99.0,
        },
        TierThreshold {
            tier: PerformanceTier::Good,
            max_avg_response_secs: 0.5,
            min_success_rate: 95.0,
        },
        TierThreshold {
            tier: PerformanceTier::Acceptable,
            max_avg_response_secs: 1.0,
            min_success_rate: 90.0,
        },
        TierThreshold {
            tier: PerformanceTier::Poor,
            max_avg_response_secs: 3.0,
            min_success_rate: 80.0,
        },
    ]
}

/// Grade a batch against the threshold table, best tier first
pub fn classify_tier(
    thresholds: &[TierThreshold],
    avg_response_secs: f64,
    success_rate: f64,
) -> PerformanceTier {
    thresholds
        .iter()
        .find(|t| avg_response_secs <= t.max_avg_response_secs && success_rate >= t.min_success_rate)
        .map(|t| t.tier)
        .unwrap_or(PerformanceTier::BelowPoor)
}
