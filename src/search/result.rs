// src/search/result.rs
// Result types returned by the search engine.

use serde::Serialize;

/// One ranked page.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    /// Root URL of the site the page belongs to.
    pub site: String,
    pub site_name: String,
    /// Page path relative to the site root.
    pub uri: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
    /// Relative relevance in (0, 1]; the best page scores 1.0.
    pub relevance: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    /// `total` is the full number of matching pages; `results` the
    /// requested slice of them.
    Found {
        total: usize,
        results: Vec<SearchResult>,
    },
    NoResults,
}

impl SearchOutcome {
    pub fn total(&self) -> usize {
        match self {
            SearchOutcome::Found { total, .. } => *total,
            SearchOutcome::NoResults => 0,
        }
    }

    pub fn results(&self) -> &[SearchResult] {
        match self {
            SearchOutcome::Found { results, .. } => results,
            SearchOutcome::NoResults => &[],
        }
    }
}

/// Raw text between the first `<title>` and the following `</title>`,
/// or empty when either marker is missing.
pub fn extract_title(content: &str) -> String {
    const OPEN: &str = "<title>";
    const CLOSE: &str = "</title>";

    let Some(start) = content.find(OPEN) else {
        return String::new();
    };
    let rest = &content[start + OPEN.len()..];
    match rest.find(CLOSE) {
        Some(end) => rest[..end].to_string(),
        None => String::new(),
    }
}
