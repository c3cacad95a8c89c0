use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use bytes::Bytes;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::{FetchError, SourceDescriptor, Transport};

/// Build a zip archive in memory. Each entry is (path_in_zip, content).
pub fn build_zip(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for (path, content) in entries {
        writer.start_file(*path, options).unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }

    writer.finish().unwrap().into_inner()
}

#[derive(Debug, Clone)]
enum Reply {
    Body(Bytes),
    Status(u16),
    Unreachable(String),
}

/// In-memory transport for testing.
///
/// Replies are configured per URI, with an optional fallback for every other
/// URI. Tracks how many fetches ran and the peak number running at once.
pub struct StaticTransport {
    replies: HashMap<String, Reply>,
    fallback: Option<Reply>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl StaticTransport {
    pub fn new() -> Self {
        Self {
            replies: HashMap::new(),
            fallback: None,
            delay: None,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    pub fn with_body(mut self, uri: &str, body: impl Into<Bytes>) -> Self {
        self.replies.insert(uri.to_owned(), Reply::Body(body.into()));
        self
    }

    pub fn with_status(mut self, uri: &str, status: u16) -> Self {
        self.replies.insert(uri.to_owned(), Reply::Status(status));
        self
    }

    pub fn with_unreachable(mut self, uri: &str) -> Self {
        self.replies
            .insert(uri.to_owned(), Reply::Unreachable(format!("connection refused: {uri}")));
        self
    }

    /// Serve `body` for every URI without an explicit reply.
    pub fn with_default_body(mut self, body: impl Into<Bytes>) -> Self {
        self.fallback = Some(Reply::Body(body.into()));
        self
    }

    /// Hold every fetch open for `delay` so overlapping calls can be observed.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of fetches started.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of fetches that were running at the same time.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

impl Default for StaticTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Transport for StaticTransport {
    async fn fetch(&self, source: &SourceDescriptor) -> Result<Bytes, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(running, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let reply = self
            .replies
            .get(&source.uri)
            .or(self.fallback.as_ref())
            .cloned()
            .unwrap_or(Reply::Status(404));

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match reply {
            Reply::Body(body) => Ok(body),
            Reply::Status(status) => Err(FetchError::Status { status }),
            Reply::Unreachable(msg) => Err(FetchError::Transport(msg)),
        }
    }
}
