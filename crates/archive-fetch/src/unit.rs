//! The per-source unit of work shared by every strategy:
//! fetch the body, write it atomically, then extract it.

use std::io::Write;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use tracing::{error, info};

use crate::extract::{ExtractError, extract_archive};
use crate::outcome::{ExtractionOutcome, FetchOutcome, ItemReport};
use crate::source::{LocalArchive, SourceDescriptor};
use crate::transport::{FetchError, Transport};

/// Fetch `source` and write it to its local archive path.
///
/// The body is written to a temporary file in the destination directory and
/// renamed into place once complete, so a reader of the archive path only
/// ever sees a fully written file.
pub async fn fetch_to_disk(
    transport: &dyn Transport,
    source: &SourceDescriptor,
    destination: &Path,
) -> FetchOutcome {
    match try_fetch_to_disk(transport, source, destination).await {
        Ok(archive) => {
            info!(uri = %source, path = %archive.path.display(), "downloaded");
            FetchOutcome::Downloaded(archive)
        }
        Err(err) => {
            error!(uri = %source, cause = %err, "download failed");
            FetchOutcome::Failed(source.clone(), err)
        }
    }
}

async fn try_fetch_to_disk(
    transport: &dyn Transport,
    source: &SourceDescriptor,
    destination: &Path,
) -> Result<LocalArchive, FetchError> {
    // Validate the name before touching the network.
    let archive = LocalArchive::for_source(source, destination)?;
    let body = transport.fetch(source).await?;

    let dir = destination.to_path_buf();
    let path = archive.path.clone();
    tokio::task::spawn_blocking(move || write_atomically(&dir, &path, &body))
        .await
        .map_err(|e| FetchError::Io(format!("write task failed: {e}")))??;

    Ok(archive)
}

fn write_atomically(dir: &Path, path: &Path, body: &Bytes) -> Result<(), FetchError> {
    let mut temp = tempfile::NamedTempFile::new_in(dir)
        .map_err(|e| FetchError::Io(format!("cannot create file in {}: {e}", dir.display())))?;
    temp.write_all(body)
        .and_then(|()| temp.flush())
        .map_err(|e| FetchError::Io(format!("cannot write {}: {e}", path.display())))?;
    temp.persist(path)
        .map_err(|e| FetchError::Io(format!("cannot rename into {}: {}", path.display(), e.error)))?;
    Ok(())
}

/// Run extraction for a downloaded archive off the async executor.
pub async fn extract(
    archive: LocalArchive,
    destination: PathBuf,
) -> Result<ExtractionOutcome, ExtractError> {
    let path = archive.path.clone();
    tokio::task::spawn_blocking(move || extract_archive(&archive, &destination))
        .await
        .unwrap_or_else(|e| {
            Err(ExtractError::Io {
                path,
                message: format!("extraction task failed: {e}"),
            })
        })
}

/// Fetch then extract one source. Never fails: every error is folded into
/// the returned report.
pub async fn process_item(
    transport: &dyn Transport,
    index: usize,
    source: SourceDescriptor,
    destination: &Path,
) -> ItemReport {
    let fetch = fetch_to_disk(transport, &source, destination).await;

    let extraction = match &fetch {
        FetchOutcome::Downloaded(archive) => {
            let result = extract(archive.clone(), destination.to_path_buf()).await;
            if let Err(err) = &result {
                error!(uri = %source, cause = %err, "extraction failed");
            }
            Some(result)
        }
        FetchOutcome::Failed(..) => None,
    };

    ItemReport {
        index,
        source,
        fetch,
        extraction,
    }
}

#[cfg(test)]
mod tests {
    use crate::naming::NamingError;
    use crate::test_support::{StaticTransport, build_zip};

    use super::*;

    #[tokio::test]
    async fn downloads_and_extracts() {
        let dir = tempfile::tempdir().unwrap();
        let transport = StaticTransport::new().with_body(
            "https://host/trips.zip",
            build_zip(&[("trips.csv", "a,b\n")]),
        );

        let report = process_item(
            &transport,
            0,
            SourceDescriptor::new("https://host/trips.zip"),
            dir.path(),
        )
        .await;

        assert!(report.is_extracted());
        assert!(!dir.path().join("trips").exists());
        assert!(dir.path().join("trips.csv").exists());
    }

    #[tokio::test]
    async fn failed_fetch_skips_extraction_and_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let transport = StaticTransport::new().with_status("https://host/gone.zip", 404);

        let report = process_item(
            &transport,
            3,
            SourceDescriptor::new("https://host/gone.zip"),
            dir.path(),
        )
        .await;

        assert_eq!(report.index, 3);
        assert!(report.extraction.is_none());
        assert_eq!(
            report.fetch,
            FetchOutcome::Failed(
                SourceDescriptor::new("https://host/gone.zip"),
                FetchError::Status { status: 404 }
            )
        );
        assert!(!dir.path().join("gone").exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn invalid_name_never_reaches_transport() {
        let dir = tempfile::tempdir().unwrap();
        let transport = StaticTransport::new();

        let report = process_item(
            &transport,
            0,
            SourceDescriptor::new("https://host/archive.tar.gz"),
            dir.path(),
        )
        .await;

        assert!(matches!(
            report.fetch,
            FetchOutcome::Failed(_, FetchError::InvalidName(_))
        ));
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn dot_name_never_reaches_transport() {
        let dir = tempfile::tempdir().unwrap();
        let transport = StaticTransport::new().with_default_body(build_zip(&[("a.csv", "1")]));

        let report = process_item(
            &transport,
            0,
            SourceDescriptor::new("https://host/...zip"),
            dir.path(),
        )
        .await;

        assert!(matches!(
            report.fetch,
            FetchOutcome::Failed(_, FetchError::InvalidName(NamingError::ReservedName { .. }))
        ));
        assert_eq!(transport.calls(), 0);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn corrupt_body_is_kept_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let transport =
            StaticTransport::new().with_body("https://host/bad.zip", b"not a zip".to_vec());

        let report = process_item(
            &transport,
            0,
            SourceDescriptor::new("https://host/bad.zip"),
            dir.path(),
        )
        .await;

        assert!(report.is_corrupt());
        assert!(matches!(
            report.extraction,
            Some(Ok(ExtractionOutcome::Corrupt(_)))
        ));
        assert_eq!(std::fs::read(dir.path().join("bad")).unwrap(), b"not a zip");
    }

    #[tokio::test]
    async fn missing_destination_is_an_io_failure() {
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("does-not-exist");
        let transport =
            StaticTransport::new().with_body("https://host/a.zip", build_zip(&[("a.csv", "1")]));

        let report = process_item(
            &transport,
            0,
            SourceDescriptor::new("https://host/a.zip"),
            &destination,
        )
        .await;

        assert!(matches!(
            report.fetch,
            FetchOutcome::Failed(_, FetchError::Io(_))
        ));
        assert!(report.is_failed());
    }
}
