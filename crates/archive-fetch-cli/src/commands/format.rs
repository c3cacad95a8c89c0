use archive_fetch::{BatchReport, ExtractionOutcome, FetchOutcome, ItemReport, SourceDescriptor};

const MAX_NAME_WIDTH: usize = 40;
const LINE_BUDGET: usize = 100;

pub fn print_report(report: &BatchReport) {
    for line in report_lines(report) {
        println!("{line}");
    }
}

pub fn print_sources(sources: &[SourceDescriptor]) {
    for line in source_lines(sources) {
        println!("{line}");
    }
}

fn report_lines(report: &BatchReport) -> Vec<String> {
    let mut lines: Vec<String> = report
        .items
        .iter()
        .map(|item| {
            let (label, detail) = describe(item);
            let uri = truncate(&item.source.uri, LINE_BUDGET.saturating_sub(12));
            match detail {
                Some(detail) => format!("  {label:<9} {uri}\n            {detail}"),
                None => format!("  {label:<9} {uri}"),
            }
        })
        .collect();

    if !lines.is_empty() {
        lines.push(String::new());
    }
    lines.push(report.to_string());
    lines
}

fn describe(item: &ItemReport) -> (&'static str, Option<String>) {
    match (&item.fetch, &item.extraction) {
        (FetchOutcome::Failed(_, err), _) => ("failed", Some(err.to_string())),
        (_, Some(Ok(ExtractionOutcome::ExtractedAndRemoved(_)))) => ("extracted", None),
        (_, Some(Ok(ExtractionOutcome::Corrupt(archive)))) => (
            "corrupt",
            Some(format!("kept at {}", archive.path.display())),
        ),
        (_, Some(Ok(ExtractionOutcome::Missing(archive)))) => (
            "missing",
            Some(format!("nothing at {}", archive.path.display())),
        ),
        (_, Some(Err(err))) => ("failed", Some(err.to_string())),
        (FetchOutcome::Downloaded(_), None) => ("fetched", None),
    }
}

fn source_lines(sources: &[SourceDescriptor]) -> Vec<String> {
    if sources.is_empty() {
        return Vec::new();
    }

    let names: Vec<String> = sources
        .iter()
        .map(|source| match archive_fetch::archive_name(&source.uri) {
            Ok(name) => name,
            Err(e) => format!("<{e}>"),
        })
        .collect();

    let name_width = names
        .iter()
        .map(|n| n.chars().count())
        .max()
        .unwrap_or(0)
        .min(MAX_NAME_WIDTH);
    let uri_budget = LINE_BUDGET.saturating_sub(2 + name_width + 2);

    let mut lines: Vec<String> = names
        .iter()
        .zip(sources)
        .map(|(name, source)| {
            format!(
                "  {:<width$}  {}",
                truncate(name, name_width),
                truncate(&source.uri, uri_budget),
                width = name_width
            )
        })
        .collect();

    lines.push(format!("\n{} sources", sources.len()));
    lines
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_owned()
    } else if max <= 3 {
        s.chars().take(max).collect()
    } else {
        let mut out: String = s.chars().take(max - 3).collect();
        out.push_str("...");
        out
    }
}
