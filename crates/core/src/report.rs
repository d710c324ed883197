// Batch report: derived metrics and text rendering
//
// Pure reduction over a finished batch. Building the report twice from the
// same BatchResult gives identical values.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::time::Duration;

use crate::config::{classify_tier, PerformanceTier, TierThreshold};
use crate::query::QueryCategory;
use crate::runner::BatchResult;

/// Latency histogram buckets: `[lower, upper)` in seconds
pub const HISTOGRAM_BUCKETS: [(f64, f64, &str); 5] = [
    (0.0, 0.1, "0-100ms"),
    (0.1, 0.5, "100-500ms"),
    (0.5, 1.0, "500ms-1s"),
    (1.0, 3.0, "1-3s"),
    (3.0, f64::INFINITY, ">3s"),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatencySummary {
    pub mean_secs: f64,
    pub min_secs: f64,
    pub max_secs: f64,
    /// Sample standard deviation; 0 with fewer than two samples
    pub std_dev_secs: f64,
}

impl LatencySummary {
    /// `None` when there are no samples
    pub fn from_durations(durations: &[Duration]) -> Option<Self> {
        if durations.is_empty() {
            return None;
        }

        let secs: Vec<f64> = durations.iter().map(Duration::as_secs_f64).collect();
        let n = secs.len() as f64;
        let mean = secs.iter().sum::<f64>() / n;
        let min = secs.iter().copied().fold(f64::INFINITY, f64::min);
        let max = secs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let std_dev = if secs.len() < 2 {
            0.0
        } else {
            let variance = secs.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / (n - 1.0);
            variance.sqrt()
        };

        Some(Self {
            mean_secs: mean,
            min_secs: min,
            max_secs: max,
            std_dev_secs: std_dev,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBucket {
    pub label: String,
    pub lower_secs: f64,
    /// `None` for the open-ended last bucket
    pub upper_secs: Option<f64>,
    pub count: u64,
    /// Share of successful requests, in percent
    pub percentage: f64,
}

/// Count durations into [`HISTOGRAM_BUCKETS`]
pub fn histogram(durations: &[Duration]) -> Vec<HistogramBucket> {
    let total = durations.len();
    HISTOGRAM_BUCKETS
        .iter()
        .map(|&(lower, upper, label)| {
            let count = durations
                .iter()
                .map(Duration::as_secs_f64)
                .filter(|&s| lower <= s && s < upper)
                .count() as u64;
            HistogramBucket {
                label: label.to_string(),
                lower_secs: lower,
                upper_secs: upper.is_finite().then_some(upper),
                count,
                percentage: percent(count, total as u64),
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryShare {
    pub category: QueryCategory,
    pub count: u64,
    /// Share of all requests, in percent
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorShare {
    pub error: String,
    pub count: u64,
    /// Share of failed requests only, in percent
    pub percentage: f64,
}

/// Everything printed after a batch
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport {
    pub target: String,
    pub category: QueryCategory,
    pub concurrency: usize,
    pub total_requests: u64,
    pub started_at: DateTime<Utc>,
    pub elapsed_secs: f64,
    /// Requests per second over the whole batch
    pub throughput: f64,
    pub success_requests: u64,
    pub failed_requests: u64,
    pub success_rate: f64,
    pub unparsed_payloads: u64,
    pub rows_returned: u64,
    pub latency: Option<LatencySummary>,
    pub histogram: Vec<HistogramBucket>,
    pub categories: Vec<CategoryShare>,
    pub errors: Vec<ErrorShare>,
    /// Informational grade; absent when nothing succeeded
    pub tier: Option<PerformanceTier>,
}

impl BatchReport {
    pub fn build(result: &BatchResult, target: &str, thresholds: &[TierThreshold]) -> Self {
        let stats = &result.stats;
        let total = stats.total_requests();
        let failed = stats.failed_requests();
        let elapsed_secs = result.elapsed.as_secs_f64();

        let throughput = if elapsed_secs > 0.0 {
            total as f64 / elapsed_secs
        } else {
            0.0
        };
        let success_rate = percent(stats.success_requests(), total);
        let latency = LatencySummary::from_durations(stats.response_times());
        let tier = latency
            .as_ref()
            .map(|l| classify_tier(thresholds, l.mean_secs, success_rate));

        let categories = stats
            .category_counts()
            .iter()
            .map(|(&category, &count)| CategoryShare {
                category,
                count,
                percentage: percent(count, total),
            })
            .collect();

        let mut errors: Vec<ErrorShare> = stats
            .error_details()
            .iter()
            .map(|(error, &count)| ErrorShare {
                error: error.clone(),
                count,
                percentage: percent(count, failed),
            })
            .collect();
        errors.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.error.cmp(&b.error)));

        Self {
            target: target.to_string(),
            category: result.settings.category,
            concurrency: result.settings.concurrency,
            total_requests: total,
            started_at: result.started_at,
            elapsed_secs,
            throughput,
            success_requests: stats.success_requests(),
            failed_requests: failed,
            success_rate,
            unparsed_payloads: stats.unparsed_payloads(),
            rows_returned: stats.rows_returned(),
            latency,
            histogram: histogram(stats.response_times()),
            categories,
            errors,
            tier,
        }
    }
}

fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    part as f64 / whole as f64 * 100.0
}

const RULE: &str =
    "================================================================================";
const THIN_RULE: &str =
    "--------------------------------------------------------------------------------";

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", RULE)?;
        writeln!(f, "Load Test Report")?;
        writeln!(f, "{}", RULE)?;
        writeln!(f, "Target:          {}", self.target)?;
        writeln!(f, "Query category:  {}", self.category)?;
        writeln!(f, "Concurrency:     {}", self.concurrency)?;
        writeln!(f, "Total requests:  {}", self.total_requests)?;
        writeln!(f, "Started at:      {}", self.started_at.to_rfc3339())?;
        writeln!(f, "Total time:      {:.2}s", self.elapsed_secs)?;
        writeln!(f, "Throughput:      {:.2} req/s", self.throughput)?;
        writeln!(f, "{}", THIN_RULE)?;
        writeln!(f, "Successful:      {}", self.success_requests)?;
        writeln!(f, "Failed:          {}", self.failed_requests)?;
        writeln!(f, "Success rate:    {:.2}%", self.success_rate)?;
        writeln!(f, "Rows returned:   {}", self.rows_returned)?;
        if self.unparsed_payloads > 0 {
            writeln!(f, "Unparsed bodies: {}", self.unparsed_payloads)?;
        }

        if let Some(latency) = &self.latency {
            writeln!(f, "Mean response:   {:.3}s", latency.mean_secs)?;
            writeln!(f, "Fastest:         {:.3}s", latency.min_secs)?;
            writeln!(f, "Slowest:         {:.3}s", latency.max_secs)?;
            writeln!(f, "Std deviation:   {:.3}s", latency.std_dev_secs)?;

            writeln!(f, "\nResponse time distribution:")?;
            for bucket in &self.histogram {
                writeln!(
                    f,
                    "  {:<10} {:>6} ({:.1}%)",
                    bucket.label, bucket.count, bucket.percentage
                )?;
            }
        }

        writeln!(f, "\nQuery categories:")?;
        for share in &self.categories {
            writeln!(
                f,
                "  {:<10} {:>6} ({:.1}%)",
                share.category.as_str(),
                share.count,
                share.percentage
            )?;
        }

        if !self.errors.is_empty() {
            writeln!(f, "\nErrors:")?;
            for share in &self.errors {
                writeln!(
                    f,
                    "  - {}: {} ({:.1}%)",
                    share.error, share.count, share.percentage
                )?;
            }
        }

        if let Some(tier) = self.tier {
            writeln!(f, "\nPerformance tier: {}", tier)?;
        }

        write!(f, "{}", RULE)
    }
}
