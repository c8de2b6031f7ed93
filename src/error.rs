// src/error.rs
// =============================================================================
// Error types shared by the crawler, the store and the configuration loader.
//
// The library side uses `thiserror` enums so callers can match on what went
// wrong. The binary (main.rs) wraps them in `anyhow` with extra context.
//
// Fetch failures (bad status, DNS, TLS...) are NOT errors at this level:
// they are recorded on the page and only end that branch of the crawl.
// =============================================================================

use thiserror::Error;

/// Errors raised by a `Storage` implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A referenced row does not exist (stale id after a concurrent delete).
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: u64 },

    /// The store lock was poisoned by a panicking writer.
    #[error("store lock poisoned")]
    Poisoned,

    /// Reading or writing the snapshot file failed.
    #[error("snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The snapshot file is not valid JSON for our schema.
    #[error("snapshot format error: {0}")]
    Format(#[from] serde_json::Error),
}

/// Errors raised while crawling a single URL.
#[derive(Debug, Error)]
pub enum CrawlError {
    /// The crawl was cancelled while this unit was waiting or fetching.
    #[error("interrupted while processing {0}")]
    Interrupted(String),

    /// The URL could not be parsed.
    #[error("invalid URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// The HTTP client could not be constructed.
    #[error("HTTP client error: {0}")]
    Client(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors raised while loading or validating the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_not_found() {
        let err = StoreError::NotFound {
            entity: "page",
            id: 7,
        };
        assert_eq!(err.to_string(), "page 7 not found");
    }

    #[test]
    fn display_interrupted() {
        let err = CrawlError::Interrupted("https://example.com/a".into());
        assert_eq!(
            err.to_string(),
            "interrupted while processing https://example.com/a"
        );
    }

    #[test]
    fn store_error_converts_into_crawl_error() {
        let err: CrawlError = StoreError::Poisoned.into();
        assert_eq!(err.to_string(), "store lock poisoned");
    }

    #[test]
    fn errors_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<StoreError>();
        assert_send_sync::<CrawlError>();
        assert_send_sync::<ConfigError>();
    }
}
