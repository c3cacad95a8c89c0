mod commands;
mod config;
mod logging;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use crate::config::{Overrides, Settings};

#[derive(Parser)]
#[command(name = "archive-fetch")]
#[command(about = "Download zip archives and extract them in place")]
struct Cli {
    /// Config file (defaults to ~/.config/archive-fetch/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Download and extract every configured archive
    Run {
        /// Fetch strategy: sync, async, or threaded
        #[arg(long)]
        mode: Option<String>,
        /// Directory that receives archives and their contents
        #[arg(long)]
        dest: Option<PathBuf>,
        /// Directory for the per-run log file
        #[arg(long)]
        log_dir: Option<PathBuf>,
        /// Maximum sources in flight (async) or worker threads (threaded)
        #[arg(long)]
        concurrency: Option<usize>,
        /// Per-request timeout in seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
        /// Exit with an error if any source failed or was corrupt
        #[arg(long)]
        fail_on_error: bool,
    },
    /// List configured sources and the local names they map to
    Sources,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let loaded = config::load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Run {
            mode,
            dest,
            log_dir,
            concurrency,
            timeout_secs,
            fail_on_error,
        } => {
            let settings = Settings::resolve(
                loaded.config,
                Overrides {
                    destination_dir: dest,
                    log_dir,
                    concurrency_limit: concurrency,
                    mode,
                    timeout_secs,
                },
            );

            let log_path = logging::init(&settings.log_dir)?;
            info!(path = %log_path.display(), "logging to file");
            for warning in &loaded.warnings {
                warn!("{warning}");
            }

            commands::run::run(&settings, fail_on_error).await
        }
        Command::Sources => {
            for warning in &loaded.warnings {
                eprintln!("warning: {warning}");
            }
            let settings = Settings::resolve(loaded.config, Overrides::default());
            commands::sources::run(&settings.sources);
            Ok(())
        }
    }
}
