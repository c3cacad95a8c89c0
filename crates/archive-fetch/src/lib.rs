//! Fetch remote archives, write them to disk, and expand them in place.
//!
//! An [`Orchestrator`] runs one [`FetchStrategy`] over a list of
//! [`SourceDescriptor`]s. Every strategy drives the same per-source unit
//! (fetch through a [`Transport`], write atomically, extract) and differs
//! only in how those units are scheduled.

pub mod extract;
pub mod naming;
pub mod orchestrator;
pub mod outcome;
pub mod source;
pub mod strategy;
pub mod transport;
pub mod unit;

pub use extract::{ExtractError, extract_archive};
pub use naming::{NamingError, archive_name};
pub use orchestrator::{DEFAULT_CONCURRENCY_LIMIT, Orchestrator, OrchestratorConfig, RunError};
pub use outcome::{BatchReport, ExtractionOutcome, FetchOutcome, ItemReport};
pub use source::{LocalArchive, SourceDescriptor};
pub use strategy::{FetchStrategy, PoolError, UnknownStrategy};
pub use transport::{FetchError, Transport};

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
