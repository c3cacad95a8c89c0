use std::fmt;

use crate::extract::ExtractError;
use crate::source::{LocalArchive, SourceDescriptor};
use crate::strategy::FetchStrategy;
use crate::transport::FetchError;

/// Result of fetching one source and writing it to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Downloaded(LocalArchive),
    Failed(SourceDescriptor, FetchError),
}

impl FetchOutcome {
    pub fn is_downloaded(&self) -> bool {
        matches!(self, Self::Downloaded(_))
    }
}

/// Result of expanding a completely written archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionOutcome {
    /// Contents expanded and the archive file deleted.
    ExtractedAndRemoved(LocalArchive),
    /// Not a valid archive. The file is left on disk.
    Corrupt(LocalArchive),
    /// Nothing to extract at the archive path.
    Missing(LocalArchive),
}

/// Everything that happened to one source during a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemReport {
    /// Position of the source in the configured list.
    pub index: usize,
    pub source: SourceDescriptor,
    pub fetch: FetchOutcome,
    /// `None` when the fetch failed and extraction was skipped.
    pub extraction: Option<Result<ExtractionOutcome, ExtractError>>,
}

impl ItemReport {
    pub(crate) fn fetch_failed(index: usize, source: SourceDescriptor, error: FetchError) -> Self {
        Self {
            index,
            fetch: FetchOutcome::Failed(source.clone(), error),
            source,
            extraction: None,
        }
    }

    pub fn is_extracted(&self) -> bool {
        matches!(
            self.extraction,
            Some(Ok(ExtractionOutcome::ExtractedAndRemoved(_)))
        )
    }

    pub fn is_corrupt(&self) -> bool {
        matches!(self.extraction, Some(Ok(ExtractionOutcome::Corrupt(_))))
    }

    /// True if the fetch failed or extraction hit an I/O error or found no file.
    pub fn is_failed(&self) -> bool {
        match &self.extraction {
            None => true,
            Some(Err(_)) | Some(Ok(ExtractionOutcome::Missing(_))) => true,
            Some(Ok(_)) => false,
        }
    }
}

/// Aggregate result of running one strategy over the whole source list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub strategy: FetchStrategy,
    /// One entry per source, in source order.
    pub items: Vec<ItemReport>,
}

impl BatchReport {
    pub fn new(strategy: FetchStrategy, mut items: Vec<ItemReport>) -> Self {
        items.sort_by_key(|item| item.index);
        Self { strategy, items }
    }

    pub fn total(&self) -> usize {
        self.items.len()
    }

    pub fn downloaded(&self) -> usize {
        self.items
            .iter()
            .filter(|item| item.fetch.is_downloaded())
            .count()
    }

    pub fn extracted(&self) -> usize {
        self.items.iter().filter(|item| item.is_extracted()).count()
    }

    pub fn corrupt(&self) -> usize {
        self.items.iter().filter(|item| item.is_corrupt()).count()
    }

    pub fn failed(&self) -> usize {
        self.items.iter().filter(|item| item.is_failed()).count()
    }

    /// True if every source was fetched and extracted.
    pub fn is_clean(&self) -> bool {
        self.extracted() == self.total()
    }

    pub fn item_for(&self, uri: &str) -> Option<&ItemReport> {
        self.items.iter().find(|item| item.source.uri == uri)
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} sources ({}): {} downloaded, {} extracted, {} corrupt, {} failed",
            self.total(),
            self.strategy,
            self.downloaded(),
            self.extracted(),
            self.corrupt(),
            self.failed(),
        )
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn archive(name: &str) -> LocalArchive {
        LocalArchive {
            name: name.to_owned(),
            path: PathBuf::from("downloads").join(name),
        }
    }

    fn downloaded(index: usize, name: &str, extraction: ExtractionOutcome) -> ItemReport {
        ItemReport {
            index,
            source: SourceDescriptor::new(format!("https://host/{name}.zip")),
            fetch: FetchOutcome::Downloaded(archive(name)),
            extraction: Some(Ok(extraction)),
        }
    }

    #[test]
    fn counts_each_outcome() {
        let items = vec![
            downloaded(0, "a", ExtractionOutcome::ExtractedAndRemoved(archive("a"))),
            ItemReport::fetch_failed(
                1,
                SourceDescriptor::new("https://host/b.zip"),
                FetchError::Status { status: 404 },
            ),
            downloaded(2, "c", ExtractionOutcome::Corrupt(archive("c"))),
            downloaded(3, "d", ExtractionOutcome::Missing(archive("d"))),
        ];
        let report = BatchReport::new(FetchStrategy::Sequential, items);

        assert_eq!(report.total(), 4);
        assert_eq!(report.downloaded(), 3);
        assert_eq!(report.extracted(), 1);
        assert_eq!(report.corrupt(), 1);
        assert_eq!(report.failed(), 2);
        assert!(!report.is_clean());
    }

    #[test]
    fn sorts_items_into_source_order() {
        let items = vec![
            downloaded(2, "c", ExtractionOutcome::ExtractedAndRemoved(archive("c"))),
            downloaded(0, "a", ExtractionOutcome::ExtractedAndRemoved(archive("a"))),
            downloaded(1, "b", ExtractionOutcome::ExtractedAndRemoved(archive("b"))),
        ];
        let report = BatchReport::new(FetchStrategy::ThreadPool, items);

        let order: Vec<usize> = report.items.iter().map(|i| i.index).collect();
        assert_eq!(order, vec![0, 1, 2]);
        assert!(report.is_clean());
    }

    #[test]
    fn summary_line() {
        let report = BatchReport::new(
            FetchStrategy::ConcurrentAsync,
            vec![downloaded(
                0,
                "a",
                ExtractionOutcome::ExtractedAndRemoved(archive("a")),
            )],
        );
        assert_eq!(
            report.to_string(),
            "1 sources (async): 1 downloaded, 1 extracted, 0 corrupt, 0 failed"
        );
    }

    #[test]
    fn finds_item_by_uri() {
        let report = BatchReport::new(
            FetchStrategy::Sequential,
            vec![downloaded(
                0,
                "a",
                ExtractionOutcome::Corrupt(archive("a")),
            )],
        );
        assert!(report.item_for("https://host/a.zip").is_some());
        assert!(report.item_for("https://host/z.zip").is_none());
    }
}
