use std::fmt;
use std::path::{Path, PathBuf};

use crate::naming::{NamingError, archive_name};

/// A remote archive location. Immutable once the batch starts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceDescriptor {
    pub uri: String,
}

impl SourceDescriptor {
    pub fn new(uri: impl Into<String>) -> Self {
        Self { uri: uri.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.uri
    }
}

impl fmt::Display for SourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uri)
    }
}

impl From<&str> for SourceDescriptor {
    fn from(uri: &str) -> Self {
        Self::new(uri)
    }
}

/// Where a source's bytes land on disk before extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalArchive {
    /// Archive name without its extension.
    pub name: String,
    /// `destination_dir/name`.
    pub path: PathBuf,
}

impl LocalArchive {
    /// Derive the local archive for `source` inside `destination_dir`.
    pub fn for_source(
        source: &SourceDescriptor,
        destination_dir: &Path,
    ) -> Result<Self, NamingError> {
        let name = archive_name(&source.uri)?;
        let path = destination_dir.join(&name);
        Ok(Self { name, path })
    }
}

impl fmt::Display for LocalArchive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}
