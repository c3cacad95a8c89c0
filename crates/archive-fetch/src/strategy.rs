use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use futures::StreamExt;
use tracing::{debug, error};

use crate::outcome::ItemReport;
use crate::source::SourceDescriptor;
use crate::transport::{FetchError, Transport};
use crate::unit::process_item;

/// How the per-source units of a batch are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchStrategy {
    /// One source at a time, in list order.
    Sequential,
    /// Interleaved on a single task, suspending at network and file waits.
    ConcurrentAsync,
    /// A fixed pool of OS threads pulling sources from a shared queue.
    ThreadPool,
}

impl FetchStrategy {
    pub const ALL: [FetchStrategy; 3] = [
        FetchStrategy::Sequential,
        FetchStrategy::ConcurrentAsync,
        FetchStrategy::ThreadPool,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sequential => "sync",
            Self::ConcurrentAsync => "async",
            Self::ThreadPool => "threaded",
        }
    }
}

impl fmt::Display for FetchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown mode {0:?}, expected one of: sync, async, threaded")]
pub struct UnknownStrategy(pub String);

impl FromStr for FetchStrategy {
    type Err = UnknownStrategy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sync" | "sequential" => Ok(Self::Sequential),
            "async" | "concurrent" => Ok(Self::ConcurrentAsync),
            "threaded" | "thread-pool" | "pool" => Ok(Self::ThreadPool),
            _ => Err(UnknownStrategy(s.to_owned())),
        }
    }
}

/// Process every source in order, each to completion before the next.
pub(crate) async fn run_sequential(
    transport: &dyn Transport,
    sources: &[SourceDescriptor],
    destination: &Path,
) -> Vec<ItemReport> {
    let mut reports = Vec::with_capacity(sources.len());
    for (index, source) in sources.iter().enumerate() {
        reports.push(process_item(transport, index, source.clone(), destination).await);
    }
    reports
}

/// Process sources concurrently on the calling task, at most `limit` at once.
/// A limit of 0 runs one at a time.
pub(crate) async fn run_concurrent(
    transport: &dyn Transport,
    sources: &[SourceDescriptor],
    destination: &Path,
    limit: usize,
) -> Vec<ItemReport> {
    futures::stream::iter(sources.iter().cloned().enumerate())
        .map(|(index, source)| process_item(transport, index, source, destination))
        .buffer_unordered(limit.max(1))
        .collect()
        .await
}

/// Errors that prevent the thread pool from running at all.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("could not spawn any worker thread: {0}")]
    Spawn(std::io::Error),

    #[error("worker pool panicked: {0}")]
    Join(String),

    #[error("worker pool started no workers for {sources} sources")]
    NoWorkers { sources: usize },
}

/// Process sources on `workers` OS threads fed from a shared FIFO queue.
///
/// Each worker blocks on the per-source unit through the runtime handle, so
/// the units use the same transport and file code as the other strategies.
/// A unit that panics is reported as a failed source and its worker moves on
/// to the next job. Must be called from within a Tokio runtime.
pub(crate) async fn run_thread_pool(
    transport: Arc<dyn Transport>,
    sources: Vec<SourceDescriptor>,
    destination: PathBuf,
    workers: usize,
) -> Result<Vec<ItemReport>, PoolError> {
    let handle = tokio::runtime::Handle::current();
    let workers = workers.max(1);
    let total = sources.len();

    tokio::task::spawn_blocking(move || -> Result<Vec<ItemReport>, PoolError> {
        let (job_tx, job_rx) = crossbeam_channel::unbounded::<(usize, SourceDescriptor)>();
        let (report_tx, report_rx) = crossbeam_channel::unbounded::<ItemReport>();

        for job in sources.into_iter().enumerate() {
            // The receiver is held above, so this cannot fail.
            let _ = job_tx.send(job);
        }
        drop(job_tx);

        let spawned = std::thread::scope(|scope| {
            let mut spawned = 0usize;
            let mut last_error = None;

            for worker in 0..workers {
                let jobs = job_rx.clone();
                let reports = report_tx.clone();
                let handle = &handle;
                let transport = &*transport;
                let destination = destination.as_path();

                let result = std::thread::Builder::new()
                    .name(format!("fetch-worker-{worker}"))
                    .spawn_scoped(scope, move || {
                        for (index, source) in jobs.iter() {
                            debug!(worker, uri = %source, "picked up source");
                            let unit = process_item(transport, index, source.clone(), destination);
                            let report = match panic::catch_unwind(AssertUnwindSafe(|| {
                                handle.block_on(unit)
                            })) {
                                Ok(report) => report,
                                Err(payload) => {
                                    let message = panic_message(payload.as_ref());
                                    error!(worker, uri = %source, %message, "unit panicked");
                                    ItemReport::fetch_failed(
                                        index,
                                        source,
                                        FetchError::Panicked(message),
                                    )
                                }
                            };
                            if reports.send(report).is_err() {
                                break;
                            }
                        }
                    });

                match result {
                    Ok(_) => spawned += 1,
                    Err(err) => {
                        error!(worker, cause = %err, "failed to spawn worker thread");
                        last_error = Some(err);
                    }
                }
            }

            match (spawned, last_error) {
                (0, Some(err)) => Err(PoolError::Spawn(err)),
                (0, None) => Err(PoolError::NoWorkers { sources: total }),
                _ => Ok(spawned),
            }
        })?;
        debug!(spawned, "worker pool drained");

        drop(report_tx);
        Ok(report_rx.into_iter().collect())
    })
    .await
    .map_err(|e| PoolError::Join(e.to_string()))?
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mode_names() {
        assert_eq!("sync".parse::<FetchStrategy>().unwrap(), FetchStrategy::Sequential);
        assert_eq!(
            "async".parse::<FetchStrategy>().unwrap(),
            FetchStrategy::ConcurrentAsync
        );
        assert_eq!(
            "threaded".parse::<FetchStrategy>().unwrap(),
            FetchStrategy::ThreadPool
        );
    }

    #[test]
    fn parsing_trims_and_ignores_case() {
        assert_eq!(
            "  Threaded\n".parse::<FetchStrategy>().unwrap(),
            FetchStrategy::ThreadPool
        );
        assert_eq!("SYNC".parse::<FetchStrategy>().unwrap(), FetchStrategy::Sequential);
    }

    #[test]
    fn parses_aliases() {
        assert_eq!(
            "sequential".parse::<FetchStrategy>().unwrap(),
            FetchStrategy::Sequential
        );
        assert_eq!(
            "concurrent".parse::<FetchStrategy>().unwrap(),
            FetchStrategy::ConcurrentAsync
        );
        assert_eq!(
            "thread-pool".parse::<FetchStrategy>().unwrap(),
            FetchStrategy::ThreadPool
        );
    }

    #[test]
    fn rejects_unknown_mode() {
        let err = "parallel".parse::<FetchStrategy>().unwrap_err();
        assert_eq!(err, UnknownStrategy("parallel".into()));
        assert!(err.to_string().contains("sync, async, threaded"));
    }

    #[test]
    fn panic_messages_are_recovered() {
        let literal = panic::catch_unwind(|| -> u8 { panic!("boom") }).unwrap_err();
        assert_eq!(panic_message(literal.as_ref()), "boom");

        let formatted = panic::catch_unwind(|| -> u8 { panic!("bad {}", 42) }).unwrap_err();
        assert_eq!(panic_message(formatted.as_ref()), "bad 42");
    }

    #[test]
    fn display_round_trips() {
        for strategy in FetchStrategy::ALL {
            assert_eq!(strategy.to_string().parse::<FetchStrategy>().unwrap(), strategy);
        }
    }
}
