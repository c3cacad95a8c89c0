use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use archive_fetch::{DEFAULT_CONCURRENCY_LIMIT, SourceDescriptor};
use serde::{Deserialize, Serialize};

/// Built-in catalog used when the config file lists no sources.
pub const DEFAULT_SOURCES: [&str; 7] = [
    "https://divvy-tripdata.s3.amazonaws.com/Divvy_Trips_2018_Q4.zip",
    "https://divvy-tripdata.s3.amazonaws.com/Divvy_Trips_2019_Q1.zip",
    "https://divvy-tripdata.s3.amazonaws.com/Divvy_Trips_2019_Q2.zip",
    "https://divvy-tripdata.s3.amazonaws.com/Divvy_Trips_2019_Q3.zip",
    "https://divvy-tripdata.s3.amazonaws.com/Divvy_Trips_2019_Q4.zip",
    "https://divvy-tripdata.s3.amazonaws.com/Divvy_Trips_2020_Q1.zip",
    "https://divvy-tripdata.s3.amazonaws.com/Divvy_Trips_2220_Q1.zip",
];

const DEFAULT_DESTINATION: &str = "downloads";
const DEFAULT_LOG_DIR: &str = "logs";
const DEFAULT_MODE: &str = "sync";

/// Top-level application configuration as written in the TOML file.
/// Every field is optional.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    pub destination_dir: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
    pub concurrency_limit: Option<usize>,
    pub mode: Option<String>,
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub sources: Vec<SourceEntry>,
}

/// A single archive to fetch.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourceEntry {
    pub uri: String,
}

/// Config plus anything worth warning about once logging is up.
#[derive(Debug)]
pub struct LoadedConfig {
    pub config: AppConfig,
    pub warnings: Vec<String>,
}

/// Values given on the command line. They win over the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub destination_dir: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
    pub concurrency_limit: Option<usize>,
    pub mode: Option<String>,
    pub timeout_secs: Option<u64>,
}

/// Fully resolved settings for one invocation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub destination_dir: PathBuf,
    pub log_dir: PathBuf,
    pub concurrency_limit: usize,
    /// Raw mode string; parsed into a strategy right before running.
    pub mode: String,
    pub timeout: Option<Duration>,
    pub sources: Vec<SourceDescriptor>,
}

impl Settings {
    pub fn resolve(config: AppConfig, overrides: Overrides) -> Self {
        let sources = if config.sources.is_empty() {
            DEFAULT_SOURCES.iter().map(|uri| SourceDescriptor::new(*uri)).collect()
        } else {
            config
                .sources
                .into_iter()
                .map(|entry| SourceDescriptor::new(entry.uri))
                .collect()
        };

        Self {
            destination_dir: overrides
                .destination_dir
                .or(config.destination_dir)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DESTINATION)),
            log_dir: overrides
                .log_dir
                .or(config.log_dir)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DIR)),
            concurrency_limit: overrides
                .concurrency_limit
                .or(config.concurrency_limit)
                .unwrap_or(DEFAULT_CONCURRENCY_LIMIT),
            mode: overrides
                .mode
                .or(config.mode)
                .unwrap_or_else(|| DEFAULT_MODE.to_owned()),
            timeout: overrides
                .timeout_secs
                .or(config.timeout_secs)
                .map(Duration::from_secs),
            sources,
        }
    }
}

/// Config file path: `~/.config/archive-fetch/config.toml`
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("archive-fetch").join("config.toml"))
}

/// Load config from an explicit path, or from the default path with a
/// fallback to defaults.
///
/// An explicit path must exist and parse. The default path may be missing;
/// if it exists but does not parse, defaults are used and a warning is
/// returned.
pub fn load_config(explicit: Option<&Path>) -> Result<LoadedConfig> {
    if let Some(path) = explicit {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config = toml::from_str::<AppConfig>(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        return Ok(LoadedConfig {
            config,
            warnings: Vec::new(),
        });
    }

    let mut warnings = Vec::new();
    if let Some(path) = config_path()
        && let Ok(contents) = std::fs::read_to_string(&path)
    {
        match toml::from_str::<AppConfig>(&contents) {
            Ok(config) => {
                return Ok(LoadedConfig { config, warnings });
            }
            Err(e) => warnings.push(format!(
                "failed to parse config at {}, using defaults: {e}",
                path.display()
            )),
        }
    }

    Ok(LoadedConfig {
        config: AppConfig::default(),
        warnings,
    })
}
