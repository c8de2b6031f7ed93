// src/storage/mod.rs
// =============================================================================
// Persistence interface for sites, pages, lemmas and index entries.
//
// Everything that reads or writes crawl data goes through the `Storage` trait,
// so the crawler and the search engine never care how rows are kept.
// `MemoryStore` (memory.rs) is the implementation shipped with the binary; it
// keeps tables in memory and saves/loads them as a JSON snapshot.
//
// Two operations are atomic on purpose: `increment_lemma` and
// `decrement_lemma`. Workers indexing different pages of the same site call
// them concurrently, and a separate read + write would lose updates.
// =============================================================================

mod memory;

pub use memory::MemoryStore;

use crate::error::StoreError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub type SiteId = u64;
pub type PageId = u64;
pub type LemmaId = u64;

/// Lifecycle of a site inside one crawl run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SiteStatus {
    Indexing,
    Indexed,
    Failed,
}

impl fmt::Display for SiteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SiteStatus::Indexing => "INDEXING",
            SiteStatus::Indexed => "INDEXED",
            SiteStatus::Failed => "FAILED",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    /// 0 until the store assigns an id.
    pub id: SiteId,
    pub url: String,
    pub name: String,
    pub status: SiteStatus,
    pub status_time: DateTime<Utc>,
    pub last_error: Option<String>,
}

impl Site {
    /// A fresh, not yet stored site in INDEXING state.
    pub fn new(url: &str, name: &str) -> Self {
        Self {
            id: 0,
            url: url.to_string(),
            name: name.to_string(),
            status: SiteStatus::Indexing,
            status_time: Utc::now(),
            last_error: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub id: PageId,
    pub site_id: SiteId,
    /// Site-relative path, or the full URL when the relative form is empty.
    pub path: String,
    /// HTTP status code of the fetch.
    pub code: u16,
    /// Raw HTML, `None` when the fetch returned an error status.
    pub content: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lemma {
    pub id: LemmaId,
    pub site_id: SiteId,
    pub text: String,
    /// Number of pages of the site containing this lemma.
    pub frequency: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub lemma_id: LemmaId,
    pub page_id: PageId,
    /// Occurrences of the lemma in the page.
    pub rank: u32,
}

/// Row counts for one site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SiteCounts {
    pub site_id: SiteId,
    pub pages: usize,
    pub lemmas: usize,
}

/// Row counts for the whole store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreCounts {
    pub sites: usize,
    pub pages: usize,
    pub lemmas: usize,
    pub entries: usize,
    pub per_site: Vec<SiteCounts>,
}

/// Access patterns needed by the crawler, the indexer and the search engine.
pub trait Storage: Send + Sync {
    // --- sites ---

    /// Inserts the site when `id == 0`, otherwise replaces the stored row.
    fn upsert_site(&self, site: Site) -> Result<Site, StoreError>;
    fn site(&self, id: SiteId) -> Result<Option<Site>, StoreError>;
    fn all_sites(&self) -> Result<Vec<Site>, StoreError>;
    /// Sites whose URL contains `fragment`.
    fn find_sites_by_url(&self, fragment: &str) -> Result<Vec<Site>, StoreError>;
    /// Deletes sites whose URL equals `url`, together with their pages,
    /// lemmas and index entries. Returns how many sites were removed.
    fn delete_sites_by_url(&self, url: &str) -> Result<usize, StoreError>;
    /// Refreshes the status timestamp without touching the status.
    fn touch_site(&self, id: SiteId) -> Result<(), StoreError>;
    fn set_site_status(
        &self,
        id: SiteId,
        status: SiteStatus,
        last_error: Option<String>,
    ) -> Result<(), StoreError>;

    // --- pages ---

    /// Stores a page. A page already stored under the same (site, path) is
    /// replaced and keeps its id; callers retract its lemmas beforehand.
    fn save_page(&self, page: Page) -> Result<Page, StoreError>;
    fn page(&self, id: PageId) -> Result<Option<Page>, StoreError>;
    fn find_page(&self, site_id: SiteId, path: &str) -> Result<Option<Page>, StoreError>;
    /// Deletes the page and its index entries. Returns whether it existed.
    fn delete_page(&self, site_id: SiteId, path: &str) -> Result<bool, StoreError>;

    // --- lemmas ---

    fn find_lemma(&self, site_id: SiteId, text: &str) -> Result<Option<Lemma>, StoreError>;
    /// Lemma rows with this text across every site.
    fn find_lemmas(&self, text: &str) -> Result<Vec<Lemma>, StoreError>;
    /// Creates the lemma with frequency 1 or adds 1 to the existing one,
    /// as a single atomic step.
    fn increment_lemma(&self, site_id: SiteId, text: &str) -> Result<Lemma, StoreError>;
    /// Subtracts 1 from the frequency, deleting the lemma (and its entries)
    /// when it was 1. Returns the updated lemma, or `None` once deleted.
    fn decrement_lemma(&self, id: LemmaId) -> Result<Option<Lemma>, StoreError>;

    // --- index entries ---

    fn save_entry(&self, entry: IndexEntry) -> Result<(), StoreError>;
    fn entries_for_lemma(&self, lemma_id: LemmaId) -> Result<Vec<IndexEntry>, StoreError>;
    fn entries_for_page(&self, page_id: PageId) -> Result<Vec<IndexEntry>, StoreError>;
    fn find_entry(
        &self,
        lemma_id: LemmaId,
        page_id: PageId,
    ) -> Result<Option<IndexEntry>, StoreError>;
    fn delete_entries_for_lemma(&self, lemma_id: LemmaId) -> Result<usize, StoreError>;

    // --- reporting ---

    fn counts(&self) -> Result<StoreCounts, StoreError>;
}
