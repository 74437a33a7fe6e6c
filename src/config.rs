// src/config.rs
//! Application configuration.
//!
//! Lookup order:
//! 1) `$NEWS_CONFIG_PATH` (must exist)
//! 2) `config/aggregator.toml`
//! 3) `config/aggregator.json`
//! 4) built-in defaults (the five seed sources)
//!
//! Env overrides (`NEWS_CACHE_TTL_SECS`, `NEWS_FETCH_TIMEOUT_SECS`,
//! `NEWS_BIND_ADDR`) are applied on top of whatever was loaded.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::filter::{validate_window, MAX_WINDOW_DAYS, MIN_WINDOW_DAYS};
use crate::ingest::types::Source;
use crate::ingest::{
    Limits, RoundSettings, DEFAULT_FETCH_TIMEOUT, DEFAULT_MAX_CONCURRENT_FETCHES,
    PER_SOURCE_LIMIT, TOTAL_LIMIT,
};
use crate::registry::SourceRegistry;

pub const ENV_CONFIG_PATH: &str = "NEWS_CONFIG_PATH";
pub const ENV_CACHE_TTL_SECS: &str = "NEWS_CACHE_TTL_SECS";
pub const ENV_FETCH_TIMEOUT_SECS: &str = "NEWS_FETCH_TIMEOUT_SECS";
pub const ENV_BIND_ADDR: &str = "NEWS_BIND_ADDR";

pub const DEFAULT_CONFIG_TOML: &str = "config/aggregator.toml";
pub const DEFAULT_CONFIG_JSON: &str = "config/aggregator.json";

fn default_cache_ttl_secs() -> u64 {
    3600
}
fn default_per_source_limit() -> usize {
    PER_SOURCE_LIMIT
}
fn default_total_limit() -> usize {
    TOTAL_LIMIT
}
fn default_fetch_timeout_secs() -> u64 {
    DEFAULT_FETCH_TIMEOUT.as_secs()
}
fn default_max_concurrent_fetches() -> usize {
    DEFAULT_MAX_CONCURRENT_FETCHES
}
fn default_window_days() -> u32 {
    7
}
fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}
fn default_sources() -> Vec<Source> {
    SourceRegistry::default_seed().list_sources().to_vec()
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_per_source_limit")]
    pub per_source_limit: usize,
    #[serde(default = "default_total_limit")]
    pub total_limit: usize,
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,
    /// Window used when the caller does not pass one.
    #[serde(default = "default_window_days")]
    pub default_window_days: u32,
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default = "default_sources")]
    pub sources: Vec<Source>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: default_cache_ttl_secs(),
            per_source_limit: default_per_source_limit(),
            total_limit: default_total_limit(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            max_concurrent_fetches: default_max_concurrent_fetches(),
            default_window_days: default_window_days(),
            bind_addr: default_bind_addr(),
            sources: default_sources(),
        }
    }
}

impl AppConfig {
    /// Load from an explicit path. `.json` is parsed as JSON, anything else
    /// as TOML.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let is_json = path
            .extension()
            .and_then(|s| s.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let cfg: AppConfig = if is_json {
            serde_json::from_str(&content)?
        } else {
            toml::from_str(&content)?
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Env path, then file fallbacks, then defaults; env overrides last.
    pub fn load_default() -> Result<Self, ConfigError> {
        let mut cfg = if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(ConfigError::MissingPath(ENV_CONFIG_PATH));
            }
            Self::load_from(&pb)?
        } else if Path::new(DEFAULT_CONFIG_TOML).exists() {
            Self::load_from(Path::new(DEFAULT_CONFIG_TOML))?
        } else if Path::new(DEFAULT_CONFIG_JSON).exists() {
            Self::load_from(Path::new(DEFAULT_CONFIG_JSON))?
        } else {
            Self::default()
        };
        cfg.apply_env_overrides();
        cfg.validate()?;
        Ok(cfg)
    }

    /// Unparsable values are ignored with a warning.
    pub fn apply_env_overrides(&mut self) {
        if let Some(v) = parse_u64_env(ENV_CACHE_TTL_SECS) {
            self.cache_ttl_secs = v;
        }
        if let Some(v) = parse_u64_env(ENV_FETCH_TIMEOUT_SECS) {
            self.fetch_timeout_secs = v;
        }
        if let Ok(v) = std::env::var(ENV_BIND_ADDR) {
            if !v.trim().is_empty() {
                self.bind_addr = v.trim().to_string();
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("per_source_limit", self.per_source_limit as u64),
            ("total_limit", self.total_limit as u64),
            ("fetch_timeout_secs", self.fetch_timeout_secs),
            ("max_concurrent_fetches", self.max_concurrent_fetches as u64),
        ] {
            if value == 0 {
                return Err(ConfigError::ZeroLimit { field });
            }
        }
        // must be a window a request could pass itself
        validate_window(i64::from(self.default_window_days)).map_err(|_| {
            ConfigError::InvalidDefaultWindow {
                got: self.default_window_days,
                min: MIN_WINDOW_DAYS,
                max: MAX_WINDOW_DAYS,
            }
        })?;
        SourceRegistry::new(self.sources.clone()).map(|_| ())
    }

    pub fn registry(&self) -> Result<SourceRegistry, ConfigError> {
        SourceRegistry::new(self.sources.clone())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn round_settings(&self) -> RoundSettings {
        RoundSettings {
            limits: Limits {
                per_source: self.per_source_limit,
                total: self.total_limit,
            },
            fetch_timeout: Duration::from_secs(self.fetch_timeout_secs),
            max_concurrent: self.max_concurrent_fetches,
        }
    }
}

fn parse_u64_env(name: &str) -> Option<u64> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse::<u64>() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(var = name, value = %raw, "ignoring unparsable env override");
            None
        }
    }
}
