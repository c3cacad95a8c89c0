use archive_fetch::SourceDescriptor;

use super::format;

/// Print every configured source with the local name it maps to.
pub fn run(sources: &[SourceDescriptor]) {
    format::print_sources(sources);
}
