//! Configuration management for TraceFetch
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! `TRACEFETCH__<SECTION>__<KEY>` environment variables, then the
//! `LANGSMITH_API_KEY` / `LANGSMITH_ENDPOINT` variables the LangSmith SDKs use.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Default LangSmith API endpoint
pub const DEFAULT_BASE_URL: &str = "https://api.smith.langchain.com";

/// Main configuration struct
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Remote API configuration
    pub api: ApiConfig,

    /// Public trace crawl configuration
    pub crawl: CrawlConfig,

    /// Output configuration
    pub output: OutputConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from `path`, or from the platform config file when
    /// `path` is `None`. A missing default file is not an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (file, required) = match path {
            Some(p) => (Some(p.to_path_buf()), true),
            None => (default_config_path(), false),
        };

        let mut builder = config::Config::builder();
        if let Some(file) = file {
            builder = builder.add_source(config::File::from(file).required(required));
        }
        builder = builder.add_source(
            config::Environment::with_prefix("TRACEFETCH")
                .prefix_separator("__")
                .separator("__"),
        );

        let mut cfg: Config = builder.build()?.try_deserialize()?;
        cfg.apply_env_fallbacks();
        Ok(cfg)
    }

    /// Fill unset API values from the standard LangSmith environment variables
    fn apply_env_fallbacks(&mut self) {
        if self.api.api_key.is_none() {
            self.api.api_key = std::env::var("LANGSMITH_API_KEY")
                .ok()
                .filter(|k| !k.is_empty());
        }
        if self.api.base_url.is_empty() {
            self.api.base_url = std::env::var("LANGSMITH_ENDPOINT")
                .ok()
                .filter(|u| !u.is_empty())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        }
    }
}

/// Location of the config file when none is given explicitly
pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "tracefetch")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Remote API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// API base URL; empty means "use LANGSMITH_ENDPOINT or the default"
    pub base_url: String,
    /// API key for authenticated requests
    pub api_key: Option<String>,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: None,
            timeout_secs: 30,
        }
    }
}

/// Public trace crawl configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    /// Hard cap on the number of runs collected for one trace
    pub max_runs: usize,
    /// Ids per batch request (the provider accepts at most 100)
    pub batch_size: usize,
    /// Batches issued together per expansion step
    pub max_concurrent_batches: usize,
}

impl CrawlConfig {
    /// Provider ceiling for ids in one batch request
    pub const MAX_BATCH_SIZE: usize = 100;

    /// Batch size clamped into `1..=MAX_BATCH_SIZE`
    pub fn effective_batch_size(&self) -> usize {
        self.batch_size.clamp(1, Self::MAX_BATCH_SIZE)
    }

    /// Concurrency, never below one
    pub fn effective_concurrency(&self) -> usize {
        self.max_concurrent_batches.max(1)
    }
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_runs: 1000,
            batch_size: Self::MAX_BATCH_SIZE,
            max_concurrent_batches: 1,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Default output format (pretty, json or raw)
    pub default_format: String,
    /// Default maximum tree depth for pretty output
    pub max_depth: Option<usize>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            default_format: "pretty".to_string(),
            max_depth: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
    /// Log format (json or pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: "pretty".to_string(),
        }
    }
}
