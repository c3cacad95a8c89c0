use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use crate::outcome::BatchReport;
use crate::source::SourceDescriptor;
use crate::strategy::{self, FetchStrategy, PoolError};
use crate::transport::Transport;

/// Default number of sources in flight at once.
pub const DEFAULT_CONCURRENCY_LIMIT: usize = 5;

/// Everything a batch needs to know, passed in explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Receives downloaded archives and their expanded contents.
    pub destination_dir: PathBuf,
    pub sources: Vec<SourceDescriptor>,
    /// Cap on concurrent units for the async strategy, and the worker count
    /// for the thread pool. Values below 1 are treated as 1.
    pub concurrency_limit: usize,
}

impl OrchestratorConfig {
    pub fn new(
        destination_dir: impl Into<PathBuf>,
        sources: Vec<SourceDescriptor>,
        concurrency_limit: usize,
    ) -> Self {
        let concurrency_limit = if concurrency_limit == 0 {
            warn!("concurrency limit of 0 is not usable, using 1");
            1
        } else {
            concurrency_limit
        };

        Self {
            destination_dir: destination_dir.into(),
            sources,
            concurrency_limit,
        }
    }
}

/// Batch-level failures. Per-source failures never surface here.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("cannot create destination directory {}: {source}", path.display())]
    DestinationDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    WorkerPool(#[from] PoolError),
}

/// Drives one fetch strategy over the configured sources.
pub struct Orchestrator {
    config: OrchestratorConfig,
    transport: Arc<dyn Transport>,
}

impl Orchestrator {
    pub fn new(config: OrchestratorConfig, transport: Arc<dyn Transport>) -> Self {
        Self { config, transport }
    }

    /// Fetch and extract every source using `strategy`.
    ///
    /// The destination directory is created first. Individual sources may
    /// fail; the returned report records what happened to each of them.
    pub async fn run(&self, strategy: FetchStrategy) -> Result<BatchReport, RunError> {
        let destination = &self.config.destination_dir;
        tokio::fs::create_dir_all(destination)
            .await
            .map_err(|source| RunError::DestinationDir {
                path: destination.clone(),
                source,
            })?;

        info!(
            mode = %strategy,
            sources = self.config.sources.len(),
            limit = self.config.concurrency_limit,
            destination = %destination.display(),
            "starting batch"
        );

        let items = match strategy {
            FetchStrategy::Sequential => {
                strategy::run_sequential(
                    self.transport.as_ref(),
                    &self.config.sources,
                    destination,
                )
                .await
            }
            FetchStrategy::ConcurrentAsync => {
                strategy::run_concurrent(
                    self.transport.as_ref(),
                    &self.config.sources,
                    destination,
                    self.config.concurrency_limit,
                )
                .await
            }
            FetchStrategy::ThreadPool => {
                strategy::run_thread_pool(
                    Arc::clone(&self.transport),
                    self.config.sources.clone(),
                    destination.clone(),
                    self.config.concurrency_limit,
                )
                .await?
            }
        };

        let report = BatchReport::new(strategy, items);
        info!(
            downloaded = report.downloaded(),
            extracted = report.extracted(),
            corrupt = report.corrupt(),
            failed = report.failed(),
            "batch finished"
        );

        Ok(report)
    }
}
