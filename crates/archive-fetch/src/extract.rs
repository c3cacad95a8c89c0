use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};
use zip::ZipArchive;
use zip::result::ZipError;

use crate::outcome::ExtractionOutcome;
use crate::source::LocalArchive;

/// I/O failures during extraction that are not caused by a bad archive.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractError {
    #[error("I/O error at {}: {message}", path.display())]
    Io { path: PathBuf, message: String },
}

impl ExtractError {
    fn io(path: &Path, err: impl std::fmt::Display) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }
}

/// Why an archive could not be expanded.
enum Failure {
    Decode(String),
    Io(ExtractError),
}

/// Expand `archive` into `destination`, then delete the archive file.
///
/// An archive that cannot be decoded is reported as
/// [`ExtractionOutcome::Corrupt`] and left on disk; a path with no file is
/// [`ExtractionOutcome::Missing`]. Only unrelated I/O failures (an
/// unwritable destination, an undeletable archive) are returned as errors.
pub fn extract_archive(
    archive: &LocalArchive,
    destination: &Path,
) -> Result<ExtractionOutcome, ExtractError> {
    let file = match File::open(&archive.path) {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            error!(path = %archive.path.display(), "no archive to extract");
            return Ok(ExtractionOutcome::Missing(archive.clone()));
        }
        Err(err) => return Err(ExtractError::io(&archive.path, err)),
    };

    match expand(file, &archive.path, destination) {
        Ok(entries) => {
            fs::remove_file(&archive.path).map_err(|e| ExtractError::io(&archive.path, e))?;
            info!(
                path = %archive.path.display(),
                entries,
                "extracted and deleted archive"
            );
            Ok(ExtractionOutcome::ExtractedAndRemoved(archive.clone()))
        }
        Err(Failure::Decode(reason)) => {
            error!(path = %archive.path.display(), %reason, "invalid archive");
            Ok(ExtractionOutcome::Corrupt(archive.clone()))
        }
        Err(Failure::Io(err)) => Err(err),
    }
}

/// Write every entry of the zip in `file` below `destination`.
/// Returns the number of files written.
fn expand(file: File, archive_path: &Path, destination: &Path) -> Result<usize, Failure> {
    let mut zip = ZipArchive::new(file).map_err(|e| classify(e, archive_path))?;
    let mut written = 0;

    for i in 0..zip.len() {
        let mut entry = zip.by_index(i).map_err(|e| classify(e, archive_path))?;

        // Entries that would escape the destination are skipped.
        let Some(relative) = entry.enclosed_name() else {
            warn!(entry = entry.name(), "skipping entry with unsafe path");
            continue;
        };
        let out_path = destination.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&out_path)
                .map_err(|e| Failure::Io(ExtractError::io(&out_path, e)))?;
            continue;
        }

        let parent = out_path.parent().unwrap_or(destination);
        fs::create_dir_all(parent).map_err(|e| Failure::Io(ExtractError::io(parent, e)))?;

        // Entries land by rename so concurrent archives sharing an entry name
        // never interleave their bytes in one file.
        let mut out = tempfile::NamedTempFile::new_in(parent)
            .map_err(|e| Failure::Io(ExtractError::io(parent, e)))?;
        copy_entry(&mut entry, &mut out, &out_path)?;
        out.persist(&out_path)
            .map_err(|e| Failure::Io(ExtractError::io(&out_path, e.error)))?;
        debug!(path = %out_path.display(), "wrote entry");
        written += 1;
    }

    Ok(written)
}

/// Copy one entry, separating decode errors on the read side from I/O
/// errors on the write side.
fn copy_entry(entry: &mut impl Read, out: &mut impl Write, out_path: &Path) -> Result<(), Failure> {
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = match entry.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(Failure::Decode(err.to_string())),
        };
        out.write_all(&buf[..n])
            .map_err(|e| Failure::Io(ExtractError::io(out_path, e)))?;
    }
    out.flush()
        .map_err(|e| Failure::Io(ExtractError::io(out_path, e)))
}

fn classify(err: ZipError, archive_path: &Path) -> Failure {
    match err {
        ZipError::Io(io_err)
            if !matches!(
                io_err.kind(),
                io::ErrorKind::UnexpectedEof | io::ErrorKind::InvalidData
            ) =>
        {
            Failure::Io(ExtractError::io(archive_path, io_err))
        }
        other => Failure::Decode(other.to_string()),
    }
}
