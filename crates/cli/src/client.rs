// Load client wrapper around the core runner

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use sheetload_core::memory::StaticTransport;
use sheetload_core::{
    BatchReport, BatchSettings, HttpTransport, LoadRunner, LoadTestConfig, ProgressListener,
    QueryCategory, QueryGenerator, QueryTransport, RequestOutcome, ServerEntry,
};
use std::sync::Arc;
use std::time::Duration;

/// Rows and latency served by the in-memory transport in dry runs
const DRY_RUN_ROWS: usize = 10;
const DRY_RUN_DELAY: Duration = Duration::from_millis(20);

/// Pick the target: an explicit base URL wins over the registry
pub fn resolve_target(
    config: &LoadTestConfig,
    server: &str,
    base_url: Option<&str>,
) -> Result<ServerEntry> {
    if let Some(base_url) = base_url {
        return Ok(ServerEntry {
            name: "custom".to_string(),
            base_url: base_url.to_string(),
            description: "Base URL given on the command line".to_string(),
        });
    }
    Ok(config.servers.resolve(server)?.clone())
}

pub struct LoadClient {
    config: LoadTestConfig,
    endpoint: String,
    runner: LoadRunner,
    rng: StdRng,
}

impl LoadClient {
    pub fn new(
        config: LoadTestConfig,
        target: ServerEntry,
        seed: Option<u64>,
        dry_run: bool,
    ) -> Result<Self> {
        let http = HttpTransport::new(&target.base_url, &config)
            .with_context(|| format!("Failed to build HTTP client for {}", target.base_url))?;
        let endpoint = http.endpoint();
        tracing::info!(server = %target.name, endpoint = %endpoint, "Target resolved");

        let transport: Arc<dyn QueryTransport> = if dry_run {
            tracing::info!("Dry run: requests are answered in memory");
            Arc::new(StaticTransport::with_rows(DRY_RUN_ROWS).with_delay(DRY_RUN_DELAY))
        } else {
            Arc::new(http)
        };

        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            runner: LoadRunner::new(transport, QueryGenerator::new(config.vocabulary.clone())),
            config,
            endpoint,
            rng,
        })
    }

    pub fn config(&self) -> &LoadTestConfig {
        &self.config
    }

    /// Full data endpoint URL requests are sent to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn single(&mut self, category: QueryCategory) -> RequestOutcome {
        self.runner.execute_one(category, &mut self.rng).await
    }

    /// Validate, clamp to the worker limit, run and summarise one batch
    pub async fn run_batch(
        &mut self,
        settings: BatchSettings,
        progress: &dyn ProgressListener,
    ) -> Result<BatchReport> {
        settings.validate()?;
        let settings = BatchSettings {
            concurrency: self.config.clamp_concurrency(settings.concurrency),
            ..settings
        };

        let result = self
            .runner
            .run_batch(&settings, &mut self.rng, progress)
            .await?;

        Ok(BatchReport::build(
            &result,
            &self.endpoint,
            &self.config.thresholds,
        ))
    }
}
