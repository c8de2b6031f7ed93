// src/crawl/fetch.rs
// =============================================================================
// Downloads pages for the crawler.
//
// Key functionality:
// - One shared reqwest Client (connection pooling) with the crawler's
//   User-Agent and Referer on every request
// - A random polite delay to wait before each fetch
// - Sorting responses into "page with HTML", "error status" and "failed"
//
// Only markup is indexed: a 2xx response whose Content-Type is not HTML,
// XML or text counts as a failed fetch, the same as a DNS or TLS error.
// =============================================================================

use crate::config::CrawlSettings;
use crate::error::CrawlError;
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, REFERER};
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

/// What the server answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// 2xx with a markup body.
    Page { code: u16, body: String },
    /// Any non-2xx status (after redirects were followed).
    Status(u16),
}

/// The request produced no usable response at all.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{label}: {0}", label = describe(.0))]
    Transport(#[from] reqwest::Error),

    #[error("unsupported content type '{0}'")]
    Unsupported(String),
}

// Short human label for a transport failure
fn describe(error: &reqwest::Error) -> &'static str {
    // Convert error to string once, the flags below don't cover TLS
    let text = error.to_string().to_lowercase();

    if error.is_timeout() {
        "request timed out"
    } else if error.is_redirect() {
        "too many redirects"
    } else if error.is_connect() {
        if text.contains("dns") {
            "could not resolve hostname"
        } else {
            "connection failed"
        }
    } else if text.contains("certificate") || text.contains("ssl") || text.contains("tls") {
        "TLS error"
    } else {
        "request failed"
    }
}

fn is_markup(content_type: &str) -> bool {
    let content_type = content_type.to_ascii_lowercase();
    content_type.starts_with("text/") || content_type.contains("html") || content_type.contains("xml")
}

pub struct PageFetcher {
    client: Client,
    delay_ms: (u64, u64),
}

impl PageFetcher {
    pub fn new(settings: &CrawlSettings) -> Result<Self, CrawlError> {
        let referrer = HeaderValue::from_str(&settings.referrer)
            .map_err(|e| CrawlError::Client(format!("invalid referrer '{}': {e}", settings.referrer)))?;
        let mut headers = HeaderMap::new();
        headers.insert(REFERER, referrer);

        let mut builder = Client::builder()
            .user_agent(settings.user_agent.clone())
            .default_headers(headers);
        if let Some(secs) = settings.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        let client = builder
            .build()
            .map_err(|e| CrawlError::Client(e.to_string()))?;

        Ok(Self {
            client,
            delay_ms: settings.delay_ms,
        })
    }

    /// Random pause in the configured range.
    pub fn polite_delay(&self) -> Duration {
        let (min, max) = self.delay_ms;
        let millis = if min >= max {
            min
        } else {
            rand::thread_rng().gen_range(min..=max)
        };
        Duration::from_millis(millis)
    }

    pub async fn fetch(&self, url: &str) -> Result<FetchOutcome, FetchError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();

        if !status.is_success() {
            return Ok(FetchOutcome::Status(status.as_u16()));
        }

        if let Some(content_type) = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
        {
            if !is_markup(content_type) {
                return Err(FetchError::Unsupported(content_type.to_string()));
            }
        }

        let body = response.text().await?;
        Ok(FetchOutcome::Page {
            code: status.as_u16(),
            body,
        })
    }
}
