// src/config.rs
// =============================================================================
// Configuration loaded from a TOML file.
//
// The file lists the sites to crawl (root URL + display name) and tunes the
// crawler, the indexer and the search engine. Every section is optional and
// falls back to the defaults below, so a file with only `[[sites]]` works.
// =============================================================================

use crate::crawl::bare_host;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

/// One configured website.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Root URL the crawl starts from (e.g. "https://example.com").
    pub url: String,
    /// Human-readable name shown in search results.
    pub name: String,
}

/// Knobs for the frontier workers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlSettings {
    /// User-Agent sent with every request.
    pub user_agent: String,
    /// Referer header sent with every request.
    pub referrer: String,
    /// Random polite delay range in milliseconds `(min, max)` before each fetch.
    pub delay_ms: (u64, u64),
    /// How many units may fetch at the same time.
    pub max_concurrent_fetches: usize,
    /// Per-request timeout. `None` keeps the transport's defaults.
    pub request_timeout_secs: Option<u64>,
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self {
            user_agent: "WondererSearchBot".to_string(),
            referrer: "http://www.google.com".to_string(),
            delay_ms: (50, 200),
            max_concurrent_fetches: 8,
            request_timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexSettings {
    /// Store the empty stem produced by function words and rejected tokens
    /// as a regular lemma.
    pub persist_empty_stem: bool,
}

/// How `offset` and `limit` select the slice of ranked results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pagination {
    /// `offset..min(limit, total)`: both values are absolute positions.
    #[default]
    Absolute,
    /// `offset..min(offset + limit, total)`: `limit` is a page size.
    Window,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// Lemmas present on more pages than this are ignored, unless they are
    /// the last lemma left in the query.
    pub high_frequency_threshold: u32,
    /// Words shown on each side of the match in a snippet.
    pub words_around: usize,
    /// Limit used when the caller gives none.
    pub default_limit: usize,
    pub pagination: Pagination,
    /// Opening and closing markers wrapped around matched words.
    pub emphasis: (String, String),
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            high_frequency_threshold: 100,
            words_around: 3,
            default_limit: 20,
            pagination: Pagination::Absolute,
            emphasis: ("<b>".to_string(), "</b>".to_string()),
        }
    }
}

/// The whole configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Where the index snapshot is loaded from and saved to.
    #[serde(default = "default_data_file")]
    pub data_file: PathBuf,
    #[serde(default)]
    pub sites: Vec<SiteConfig>,
    #[serde(default)]
    pub crawl: CrawlSettings,
    #[serde(default)]
    pub index: IndexSettings,
    #[serde(default)]
    pub search: SearchSettings,
}

fn default_data_file() -> PathBuf {
    PathBuf::from("index.json")
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_file: default_data_file(),
            sites: Vec::new(),
            crawl: CrawlSettings::default(),
            index: IndexSettings::default(),
            search: SearchSettings::default(),
        }
    }
}

impl AppConfig {
    /// Reads, parses and validates a TOML config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_toml_str(&raw)?;
        tracing::debug!(path = %path.display(), sites = config.sites.len(), "config loaded");
        Ok(config)
    }

    /// Parses and validates TOML text.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects configurations the crawler cannot run with.
    ///
    /// Checks:
    /// - at least one site, each with a parseable http(s) URL that has a host
    /// - `delay_ms.0 <= delay_ms.1`
    /// - `max_concurrent_fetches > 0`
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sites.is_empty() {
            return Err(ConfigError::Invalid("at least one site must be configured".into()));
        }
        for site in &self.sites {
            let parsed = Url::parse(&site.url)
                .map_err(|e| ConfigError::Invalid(format!("site url '{}': {e}", site.url)))?;
            if parsed.scheme() != "http" && parsed.scheme() != "https" {
                return Err(ConfigError::Invalid(format!(
                    "site url '{}' must use http or https",
                    site.url
                )));
            }
            if parsed.host_str().is_none() {
                return Err(ConfigError::Invalid(format!("site url '{}' has no host", site.url)));
            }
        }
        if self.crawl.delay_ms.0 > self.crawl.delay_ms.1 {
            return Err(ConfigError::Invalid("crawl.delay_ms min must be <= max".into()));
        }
        if self.crawl.max_concurrent_fetches == 0 {
            return Err(ConfigError::Invalid(
                "crawl.max_concurrent_fetches must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// Finds the configured site whose host (ignoring a leading `www.`)
    /// matches the host of `url`.
    pub fn site_for_url(&self, url: &str) -> Option<&SiteConfig> {
        let target = bare_host(&Url::parse(url).ok()?)?;
        self.sites.iter().find(|site| {
            Url::parse(&site.url)
                .ok()
                .and_then(|root| bare_host(&root))
                .is_some_and(|host| host == target)
        })
    }
}
