use bytes::Bytes;

use crate::naming::NamingError;
use crate::source::SourceDescriptor;

/// Errors that can occur while fetching and persisting one archive.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("HTTP status {status}")]
    Status { status: u16 },

    #[error("I/O error: {0}")]
    Io(String),

    #[error("invalid source name: {0}")]
    InvalidName(#[from] NamingError),

    #[error("worker panicked: {0}")]
    Panicked(String),
}

/// Retrieves the full body of one source.
///
/// Implementations must be shareable across tasks and worker threads; one
/// instance serves the whole batch.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Fetch the complete response body for `source`.
    async fn fetch(&self, source: &SourceDescriptor) -> Result<Bytes, FetchError>;
}

#[async_trait::async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn fetch(&self, source: &SourceDescriptor) -> Result<Bytes, FetchError> {
        (**self).fetch(source).await
    }
}
