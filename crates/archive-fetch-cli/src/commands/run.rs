use std::sync::Arc;

use anyhow::{Context, Result};
use archive_fetch::{BatchReport, FetchStrategy, Orchestrator, OrchestratorConfig, Transport};
use archive_fetch_http::{HttpTransport, HttpTransportConfig};
use tracing::warn;

use super::format;
use crate::config::Settings;

/// Build the HTTP transport described by `settings`.
pub fn http_transport(settings: &Settings) -> Result<Arc<dyn Transport>> {
    let transport = HttpTransport::new(HttpTransportConfig {
        timeout: settings.timeout,
    })?;
    Ok(Arc::new(transport))
}

/// Run one batch with the mode named in `settings`.
///
/// An unrecognised mode is logged as a warning and nothing is fetched;
/// `Ok(None)` is returned in that case.
pub async fn execute(
    settings: &Settings,
    transport: Arc<dyn Transport>,
) -> Result<Option<BatchReport>> {
    let strategy = match settings.mode.parse::<FetchStrategy>() {
        Ok(strategy) => strategy,
        Err(e) => {
            warn!("invalid mode selected: {e}");
            return Ok(None);
        }
    };

    let config = OrchestratorConfig::new(
        &settings.destination_dir,
        settings.sources.clone(),
        settings.concurrency_limit,
    );

    let report = Orchestrator::new(config, transport)
        .run(strategy)
        .await
        .context("batch could not start")?;

    Ok(Some(report))
}

/// Run the batch and print the per-item summary to stdout.
pub async fn run(settings: &Settings, fail_on_error: bool) -> Result<()> {
    let transport = http_transport(settings)?;

    let Some(report) = execute(settings, transport).await? else {
        return Ok(());
    };

    format::print_report(&report);

    if fail_on_error && (report.failed() > 0 || report.corrupt() > 0) {
        anyhow::bail!(
            "{} of {} sources did not extract cleanly",
            report.total() - report.extracted(),
            report.total()
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use archive_fetch::SourceDescriptor;
    use archive_fetch::test_support::{StaticTransport, build_zip};

    use super::*;

    fn settings(dir: PathBuf, mode: &str, sources: &[&str]) -> Settings {
        Settings {
            destination_dir: dir.clone(),
            log_dir: dir.join("logs"),
            concurrency_limit: 5,
            mode: mode.to_owned(),
            timeout: None,
            sources: sources.iter().map(|s| SourceDescriptor::new(*s)).collect(),
        }
    }

    #[tokio::test]
    async fn invalid_mode_does_no_work() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("downloads");
        let transport = Arc::new(StaticTransport::new());

        let result = execute(
            &settings(dest.clone(), "parallel", &["https://h/a.zip"]),
            transport.clone(),
        )
        .await
        .unwrap();

        assert!(result.is_none());
        assert_eq!(transport.calls(), 0);
        assert!(!dest.exists());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn mode_string_selects_strategy() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(
            StaticTransport::new().with_default_body(build_zip(&[("a.csv", "1")])),
        );

        let report = execute(
            &settings(dir.path().to_path_buf(), " Threaded ", &["https://h/a.zip"]),
            transport,
        )
        .await
        .unwrap()
        .unwrap();

        assert_eq!(report.strategy, FetchStrategy::ThreadPool);
        assert!(report.is_clean());
    }

    #[tokio::test]
    async fn failures_do_not_fail_the_command() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(StaticTransport::new().with_status("https://h/a.zip", 404));

        let report = execute(
            &settings(dir.path().to_path_buf(), "async", &["https://h/a.zip"]),
            transport,
        )
        .await
        .unwrap()
        .unwrap();

        assert_eq!(report.failed(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn fail_on_error_turns_failures_into_an_error() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ok.zip"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(build_zip(&[("ok.csv", "1")]), "application/zip"),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/gone.zip"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let ok = format!("{}/ok.zip", server.uri());
        let gone = format!("{}/gone.zip", server.uri());
        let settings = settings(dir.path().to_path_buf(), "async", &[&ok, &gone]);

        assert!(run(&settings, false).await.is_ok());
        assert!(run(&settings, true).await.is_err());
        assert!(dir.path().join("ok.csv").exists());
    }
}
