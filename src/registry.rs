// src/registry.rs
//! Source registry: immutable name -> endpoint mapping, loaded once.

use std::collections::HashSet;

use crate::error::{AggregatorError, ConfigError};
use crate::ingest::types::Source;

#[derive(Debug, Clone)]
pub struct SourceRegistry {
    sources: Vec<Source>,
}

impl SourceRegistry {
    /// Validate and freeze the registry. Names must be unique and non-empty,
    /// endpoints must be http(s) URLs.
    pub fn new(sources: Vec<Source>) -> Result<Self, ConfigError> {
        let mut seen = HashSet::new();
        for s in &sources {
            if s.name.trim().is_empty() {
                return Err(ConfigError::EmptySourceName);
            }
            if !seen.insert(s.name.as_str()) {
                return Err(ConfigError::DuplicateSource(s.name.clone()));
            }
            validate_url(s)?;
        }
        Ok(Self { sources })
    }

    /// The five feeds the aggregator ships with.
    pub fn default_seed() -> Self {
        let sources = [
            ("TechCrunch", "https://techcrunch.com/feed/"),
            (
                "MIT Technology Review",
                "https://www.technologyreview.com/topic/artificial-intelligence/feed/",
            ),
            (
                "Science Daily",
                "https://www.sciencedaily.com/rss/computers_math/artificial_intelligence.xml",
            ),
            ("Deepmind", "https://deepmind.google/blog/rss.xml"),
            (
                "Berkeley AI Research (BAIR) Blog",
                "https://bair.berkeley.edu/blog/feed.xml",
            ),
        ]
        .into_iter()
        .map(|(name, url)| Source::new(name, url))
        .collect();
        Self { sources }
    }

    /// All sources in registry order.
    pub fn list_sources(&self) -> &[Source] {
        &self.sources
    }

    pub fn names(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.name.clone()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&Source> {
        self.sources.iter().find(|s| s.name == name)
    }

    /// Endpoint URL for `name`.
    pub fn resolve(&self, name: &str) -> Result<&str, AggregatorError> {
        self.get(name)
            .map(|s| s.url.as_str())
            .ok_or_else(|| AggregatorError::UnknownSource(name.to_string()))
    }

    /// Resolve a selection and return it in registry order. Any unknown name
    /// rejects the whole selection; duplicates collapse.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<Source>, AggregatorError> {
        for n in names {
            self.resolve(n.as_ref())?;
        }
        Ok(self
            .sources
            .iter()
            .filter(|s| names.iter().any(|n| n.as_ref() == s.name))
            .cloned()
            .collect())
    }
}

fn validate_url(s: &Source) -> Result<(), ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidUrl {
        name: s.name.clone(),
        url: s.url.clone(),
        reason,
    };
    let parsed = url::Url::parse(&s.url).map_err(|e| invalid(e.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(invalid(format!("unsupported scheme {other}"))),
    }
}
