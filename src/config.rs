//! Layered pipeline configuration.
//!
//! Configuration is resolved in the following order (later wins):
//!
//! 1. Compiled defaults
//! 2. Config file (`textweave.toml` / `.yaml` / `.json` by extension)
//! 3. Environment variables (`TEXTWEAVE_*`, with `.env` support)
//!
//! ## Example
//!
//! ```rust,ignore
//! use textweave::config::ConfigBuilder;
//!
//! let config = ConfigBuilder::new()
//!     .with_file("textweave.toml")?
//!     .with_env()
//!     .build()?;
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;
use validator::Validate;

use crate::resilience::ResilienceConfig;

/// Errors that can occur during configuration resolution.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file at {path}: {source}")]
    FileRead {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the configuration.
    #[error("failed to parse {format} config: {source}")]
    ParseError {
        /// Format that failed to parse (TOML, YAML, JSON).
        format: String,
        /// Underlying parse error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Unsupported or unrecognised configuration file extension.
    #[error("unsupported config file format: {message}")]
    UnsupportedFormat {
        /// Description of the problem.
        message: String,
    },

    /// Configuration validation failed.
    #[error("config validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    /// Environment variable parsing error.
    #[error("failed to parse environment variable {key}: {message}")]
    EnvParse {
        /// Environment variable key.
        key: String,
        /// Error message.
        message: String,
    },
}

/// Configuration for one external provider.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ProviderConfig {
    /// Stable provider name, used in logs and fallback ordering.
    #[validate(length(min = 1))]
    pub name: String,

    /// Analyze endpoint.
    pub endpoint: Url,

    /// Environment variable holding the API key, when the provider needs one.
    #[serde(default)]
    pub api_key_env: Option<String>,

    /// Maximum call starts per second.
    #[validate(range(min = 0.001))]
    #[serde(default = "defaults::calls_per_second")]
    pub calls_per_second: f64,

    /// Consecutive failures that open the circuit.
    #[validate(range(min = 1))]
    #[serde(default = "defaults::failure_threshold")]
    pub failure_threshold: u32,

    /// Seconds the circuit stays open before a trial call.
    #[serde(default = "defaults::recovery_timeout_secs")]
    pub recovery_timeout_secs: u64,

    /// Retries after the first attempt for transient failures.
    #[serde(default = "defaults::max_retries")]
    pub max_retries: u32,

    /// First-retry backoff in milliseconds; doubles per retry.
    #[validate(range(min = 1))]
    #[serde(default = "defaults::backoff_base_ms")]
    pub backoff_base_ms: u64,

    /// Per-call timeout in seconds.
    #[validate(range(min = 1))]
    #[serde(default = "defaults::request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl ProviderConfig {
    /// Minimal provider config with defaults for every tuning knob.
    pub fn new(name: impl Into<String>, endpoint: Url) -> Self {
        Self {
            name: name.into(),
            endpoint,
            api_key_env: None,
            calls_per_second: defaults::calls_per_second(),
            failure_threshold: defaults::failure_threshold(),
            recovery_timeout_secs: defaults::recovery_timeout_secs(),
            max_retries: defaults::max_retries(),
            backoff_base_ms: defaults::backoff_base_ms(),
            request_timeout_secs: defaults::request_timeout_secs(),
        }
    }

    /// Resilience tuning for this provider.
    pub fn resilience(&self) -> ResilienceConfig {
        ResilienceConfig {
            calls_per_second: self.calls_per_second,
            failure_threshold: self.failure_threshold,
            recovery_timeout: Duration::from_secs(self.recovery_timeout_secs),
            max_retries: self.max_retries,
            backoff_base: Duration::from_millis(self.backoff_base_ms),
        }
    }

    /// Per-call timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Cache bounds, as carried in config files.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Validate)]
pub struct CacheSettings {
    /// Entry time-to-live in seconds.
    #[validate(range(min = 1))]
    pub ttl_secs: u64,
    /// Maximum number of live entries.
    #[validate(range(min = 1))]
    pub max_entries: usize,
}

impl CacheSettings {
    /// Convert into runtime cache configuration.
    pub fn to_cache_config(self) -> crate::cache::CacheConfig {
        crate::cache::CacheConfig {
            ttl: Duration::from_secs(self.ttl_secs),
            max_entries: self.max_entries,
        }
    }
}

/// Main pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PipelineConfig {
    /// Maximum chunk size, in characters.
    #[validate(range(min = 1))]
    #[serde(default = "defaults::max_chunk_size")]
    pub max_chunk_size: usize,

    /// Bound on concurrently analyzed chunks.
    #[validate(range(min = 1))]
    #[serde(default = "defaults::worker_limit")]
    pub worker_limit: usize,

    /// Overall batch deadline in seconds; absent means unbounded.
    #[serde(default)]
    pub deadline_secs: Option<u64>,

    /// Maximum summary length in characters.
    #[validate(range(min = 1))]
    #[serde(default = "defaults::summary_limit")]
    pub summary_limit: usize,

    /// Maximum number of distinct topics kept.
    #[validate(range(min = 1))]
    #[serde(default = "defaults::topic_cap")]
    pub topic_cap: usize,

    /// Maximum number of key points kept.
    #[validate(range(min = 1))]
    #[serde(default = "defaults::key_point_cap")]
    pub key_point_cap: usize,

    /// Optional analysis cache bounds.
    #[serde(default)]
    #[validate(nested)]
    pub cache: Option<CacheSettings>,

    /// Providers in fallback order: primary first.
    #[serde(default)]
    #[validate(nested)]
    pub providers: Vec<ProviderConfig>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: defaults::max_chunk_size(),
            worker_limit: defaults::worker_limit(),
            deadline_secs: None,
            summary_limit: defaults::summary_limit(),
            topic_cap: defaults::topic_cap(),
            key_point_cap: defaults::key_point_cap(),
            cache: None,
            providers: Vec::new(),
        }
    }
}

impl PipelineConfig {
    /// Overall batch deadline, when configured.
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_secs.map(Duration::from_secs)
    }
}

mod defaults {
    pub(super) fn max_chunk_size() -> usize {
        4000
    }
    pub(super) fn worker_limit() -> usize {
        crate::orchestrator::DEFAULT_WORKER_LIMIT
    }
    pub(super) fn summary_limit() -> usize {
        2000
    }
    pub(super) fn topic_cap() -> usize {
        10
    }
    pub(super) fn key_point_cap() -> usize {
        8
    }
    pub(super) fn calls_per_second() -> f64 {
        2.0
    }
    pub(super) fn failure_threshold() -> u32 {
        3
    }
    pub(super) fn recovery_timeout_secs() -> u64 {
        30
    }
    pub(super) fn max_retries() -> u32 {
        3
    }
    pub(super) fn backoff_base_ms() -> u64 {
        250
    }
    pub(super) fn request_timeout_secs() -> u64 {
        30
    }
}

/// Builder for constructing a [`PipelineConfig`] from multiple sources.
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    base: PipelineConfig,
    use_env: bool,
}

impl ConfigBuilder {
    /// Start from compiled defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing config value.
    #[must_use]
    pub fn from_config(config: PipelineConfig) -> Self {
        Self {
            base: config,
            use_env: false,
        }
    }

    /// Load configuration from a file (TOML, YAML, or JSON by extension).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read or parsed.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;

        let config: PipelineConfig = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => toml::from_str(&content).map_err(|e| ConfigError::ParseError {
                format: "TOML".to_string(),
                source: Box::new(e),
            })?,
            Some("yaml" | "yml") => {
                serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
                    format: "YAML".to_string(),
                    source: Box::new(e),
                })?
            }
            Some("json") => {
                serde_json::from_str(&content).map_err(|e| ConfigError::ParseError {
                    format: "JSON".to_string(),
                    source: Box::new(e),
                })?
            }
            other => {
                return Err(ConfigError::UnsupportedFormat {
                    message: format!("expected .toml, .yaml, .yml, or .json, got {other:?}"),
                });
            }
        };

        self.base = config;
        Ok(self)
    }

    /// Apply `TEXTWEAVE_*` environment overrides at build time.
    #[must_use]
    pub fn with_env(mut self) -> Self {
        self.use_env = true;
        self
    }

    /// Resolve and validate the final configuration.
    pub fn build(mut self) -> Result<PipelineConfig, ConfigError> {
        if self.use_env {
            dotenvy::dotenv().ok();
            apply_env(&mut self.base)?;
        }
        self.base.validate()?;
        Ok(self.base)
    }
}

fn parse_env_var<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|err| ConfigError::EnvParse {
                key: key.to_string(),
                message: err.to_string(),
            }),
        Err(_) => Ok(None),
    }
}

fn apply_env(config: &mut PipelineConfig) -> Result<(), ConfigError> {
    if let Some(value) = parse_env_var("TEXTWEAVE_MAX_CHUNK_SIZE")? {
        config.max_chunk_size = value;
    }
    if let Some(value) = parse_env_var("TEXTWEAVE_WORKER_LIMIT")? {
        config.worker_limit = value;
    }
    if let Some(value) = parse_env_var("TEXTWEAVE_DEADLINE_SECS")? {
        config.deadline_secs = Some(value);
    }
    if let Some(value) = parse_env_var("TEXTWEAVE_SUMMARY_LIMIT")? {
        config.summary_limit = value;
    }
    if let Some(value) = parse_env_var("TEXTWEAVE_TOPIC_CAP")? {
        config.topic_cap = value;
    }
    if let Some(value) = parse_env_var("TEXTWEAVE_KEY_POINT_CAP")? {
        config.key_point_cap = value;
    }
    Ok(())
}
