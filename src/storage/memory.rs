// src/storage/memory.rs
// =============================================================================
// In-memory `Storage` with a JSON snapshot on disk.
//
// All tables live behind one RwLock. Reads share the lock, every mutation
// (including the lemma increment/decrement) takes the write lock, which is
// what makes the read-modify-write on a lemma frequency atomic.
//
// The index entries are kept twice, by lemma and by page, so both the search
// engine (pages for a lemma) and the indexer (lemmas of a page) are lookups
// instead of scans.
// =============================================================================

use super::{
    IndexEntry, Lemma, LemmaId, Page, PageId, Site, SiteCounts, SiteId, SiteStatus, Storage,
    StoreCounts,
};
use crate::error::StoreError;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Default)]
struct Tables {
    next_id: u64,
    sites: BTreeMap<SiteId, Site>,
    pages: BTreeMap<PageId, Page>,
    page_keys: HashMap<(SiteId, String), PageId>,
    lemmas: BTreeMap<LemmaId, Lemma>,
    lemma_keys: HashMap<(SiteId, String), LemmaId>,
    by_lemma: BTreeMap<LemmaId, BTreeMap<PageId, u32>>,
    by_page: BTreeMap<PageId, BTreeMap<LemmaId, u32>>,
}

// On-disk form: plain row lists, the lookup maps are rebuilt on load.
#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    next_id: u64,
    sites: Vec<Site>,
    pages: Vec<Page>,
    lemmas: Vec<Lemma>,
    entries: Vec<IndexEntry>,
}

impl Tables {
    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn remove_entries_of_page(&mut self, page_id: PageId) {
        if let Some(lemmas) = self.by_page.remove(&page_id) {
            for lemma_id in lemmas.keys() {
                if let Some(pages) = self.by_lemma.get_mut(lemma_id) {
                    pages.remove(&page_id);
                }
            }
        }
    }

    fn remove_entries_of_lemma(&mut self, lemma_id: LemmaId) -> usize {
        let Some(pages) = self.by_lemma.remove(&lemma_id) else {
            return 0;
        };
        for page_id in pages.keys() {
            if let Some(lemmas) = self.by_page.get_mut(page_id) {
                lemmas.remove(&lemma_id);
            }
        }
        pages.len()
    }

    fn remove_page(&mut self, page_id: PageId) {
        if let Some(page) = self.pages.remove(&page_id) {
            self.page_keys.remove(&(page.site_id, page.path));
        }
        self.remove_entries_of_page(page_id);
    }

    fn remove_lemma(&mut self, lemma_id: LemmaId) {
        if let Some(lemma) = self.lemmas.remove(&lemma_id) {
            self.lemma_keys.remove(&(lemma.site_id, lemma.text));
        }
        self.remove_entries_of_lemma(lemma_id);
    }

    fn remove_site(&mut self, site_id: SiteId) {
        self.sites.remove(&site_id);
        let pages: Vec<PageId> = self
            .pages
            .values()
            .filter(|p| p.site_id == site_id)
            .map(|p| p.id)
            .collect();
        for page_id in pages {
            self.remove_page(page_id);
        }
        let lemmas: Vec<LemmaId> = self
            .lemmas
            .values()
            .filter(|l| l.site_id == site_id)
            .map(|l| l.id)
            .collect();
        for lemma_id in lemmas {
            self.remove_lemma(lemma_id);
        }
    }

    fn to_snapshot(&self) -> Snapshot {
        let entries = self
            .by_lemma
            .iter()
            .flat_map(|(&lemma_id, pages)| {
                pages.iter().map(move |(&page_id, &rank)| IndexEntry {
                    lemma_id,
                    page_id,
                    rank,
                })
            })
            .collect();
        Snapshot {
            next_id: self.next_id,
            sites: self.sites.values().cloned().collect(),
            pages: self.pages.values().cloned().collect(),
            lemmas: self.lemmas.values().cloned().collect(),
            entries,
        }
    }

    fn from_snapshot(snapshot: Snapshot) -> Self {
        let mut tables = Tables {
            next_id: snapshot.next_id,
            ..Default::default()
        };
        for site in snapshot.sites {
            tables.sites.insert(site.id, site);
        }
        for page in snapshot.pages {
            tables.page_keys.insert((page.site_id, page.path.clone()), page.id);
            tables.pages.insert(page.id, page);
        }
        for lemma in snapshot.lemmas {
            tables.lemma_keys.insert((lemma.site_id, lemma.text.clone()), lemma.id);
            tables.lemmas.insert(lemma.id, lemma);
        }
        for entry in snapshot.entries {
            tables
                .by_lemma
                .entry(entry.lemma_id)
                .or_default()
                .insert(entry.page_id, entry.rank);
            tables
                .by_page
                .entry(entry.page_id)
                .or_default()
                .insert(entry.lemma_id, entry.rank);
        }
        tables
    }
}

/// `Storage` backed by in-memory tables.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a snapshot written by [`MemoryStore::save`]. A missing file
    /// gives an empty store.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no snapshot yet, starting empty");
            return Ok(Self::new());
        }
        let raw = std::fs::read_to_string(path)?;
        let snapshot: Snapshot = serde_json::from_str(&raw)?;
        tracing::debug!(
            path = %path.display(),
            pages = snapshot.pages.len(),
            lemmas = snapshot.lemmas.len(),
            "snapshot loaded"
        );
        Ok(Self {
            tables: RwLock::new(Tables::from_snapshot(snapshot)),
        })
    }

    /// Writes the whole store as JSON, replacing the file atomically.
    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        let snapshot = self.read()?.to_snapshot();
        let json = serde_json::to_string(&snapshot)?;
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, path)?;
        tracing::debug!(path = %path.display(), "snapshot saved");
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, StoreError> {
        self.tables.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, StoreError> {
        self.tables.write().map_err(|_| StoreError::Poisoned)
    }
}

impl Storage for MemoryStore {
    fn upsert_site(&self, mut site: Site) -> Result<Site, StoreError> {
        let mut tables = self.write()?;
        if site.id == 0 {
            site.id = tables.allocate_id();
        }
        tables.sites.insert(site.id, site.clone());
        Ok(site)
    }

    fn site(&self, id: SiteId) -> Result<Option<Site>, StoreError> {
        Ok(self.read()?.sites.get(&id).cloned())
    }

    fn all_sites(&self) -> Result<Vec<Site>, StoreError> {
        Ok(self.read()?.sites.values().cloned().collect())
    }

    fn find_sites_by_url(&self, fragment: &str) -> Result<Vec<Site>, StoreError> {
        Ok(self
            .read()?
            .sites
            .values()
            .filter(|s| s.url.contains(fragment))
            .cloned()
            .collect())
    }

    fn delete_sites_by_url(&self, url: &str) -> Result<usize, StoreError> {
        let mut tables = self.write()?;
        let doomed: Vec<SiteId> = tables
            .sites
            .values()
            .filter(|s| s.url == url)
            .map(|s| s.id)
            .collect();
        for site_id in &doomed {
            tables.remove_site(*site_id);
        }
        Ok(doomed.len())
    }

    fn touch_site(&self, id: SiteId) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        let site = tables
            .sites
            .get_mut(&id)
            .ok_or(StoreError::NotFound { entity: "site", id })?;
        site.status_time = Utc::now();
        Ok(())
    }

    fn set_site_status(
        &self,
        id: SiteId,
        status: SiteStatus,
        last_error: Option<String>,
    ) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        let site = tables
            .sites
            .get_mut(&id)
            .ok_or(StoreError::NotFound { entity: "site", id })?;
        site.status = status;
        site.status_time = Utc::now();
        site.last_error = last_error;
        Ok(())
    }

    fn save_page(&self, mut page: Page) -> Result<Page, StoreError> {
        let mut tables = self.write()?;
        let key = (page.site_id, page.path.clone());
        page.id = match tables.page_keys.get(&key) {
            Some(&existing) => existing,
            None => tables.allocate_id(),
        };
        tables.page_keys.insert(key, page.id);
        tables.pages.insert(page.id, page.clone());
        Ok(page)
    }

    fn page(&self, id: PageId) -> Result<Option<Page>, StoreError> {
        Ok(self.read()?.pages.get(&id).cloned())
    }

    fn find_page(&self, site_id: SiteId, path: &str) -> Result<Option<Page>, StoreError> {
        let tables = self.read()?;
        Ok(tables
            .page_keys
            .get(&(site_id, path.to_string()))
            .and_then(|id| tables.pages.get(id))
            .cloned())
    }

    fn delete_page(&self, site_id: SiteId, path: &str) -> Result<bool, StoreError> {
        let mut tables = self.write()?;
        match tables.page_keys.get(&(site_id, path.to_string())).copied() {
            Some(page_id) => {
                tables.remove_page(page_id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn find_lemma(&self, site_id: SiteId, text: &str) -> Result<Option<Lemma>, StoreError> {
        let tables = self.read()?;
        Ok(tables
            .lemma_keys
            .get(&(site_id, text.to_string()))
            .and_then(|id| tables.lemmas.get(id))
            .cloned())
    }

    fn find_lemmas(&self, text: &str) -> Result<Vec<Lemma>, StoreError> {
        Ok(self
            .read()?
            .lemmas
            .values()
            .filter(|l| l.text == text)
            .cloned()
            .collect())
    }

    fn increment_lemma(&self, site_id: SiteId, text: &str) -> Result<Lemma, StoreError> {
        let mut tables = self.write()?;
        let key = (site_id, text.to_string());
        if let Some(&id) = tables.lemma_keys.get(&key) {
            let lemma = tables
                .lemmas
                .get_mut(&id)
                .ok_or(StoreError::NotFound { entity: "lemma", id })?;
            lemma.frequency += 1;
            return Ok(lemma.clone());
        }
        let lemma = Lemma {
            id: tables.allocate_id(),
            site_id,
            text: text.to_string(),
            frequency: 1,
        };
        tables.lemma_keys.insert(key, lemma.id);
        tables.lemmas.insert(lemma.id, lemma.clone());
        Ok(lemma)
    }

    fn decrement_lemma(&self, id: LemmaId) -> Result<Option<Lemma>, StoreError> {
        let mut tables = self.write()?;
        let lemma = tables
            .lemmas
            .get_mut(&id)
            .ok_or(StoreError::NotFound { entity: "lemma", id })?;
        if lemma.frequency <= 1 {
            tables.remove_lemma(id);
            return Ok(None);
        }
        lemma.frequency -= 1;
        Ok(Some(lemma.clone()))
    }

    fn save_entry(&self, entry: IndexEntry) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        if !tables.lemmas.contains_key(&entry.lemma_id) {
            return Err(StoreError::NotFound {
                entity: "lemma",
                id: entry.lemma_id,
            });
        }
        if !tables.pages.contains_key(&entry.page_id) {
            return Err(StoreError::NotFound {
                entity: "page",
                id: entry.page_id,
            });
        }
        tables
            .by_lemma
            .entry(entry.lemma_id)
            .or_default()
            .insert(entry.page_id, entry.rank);
        tables
            .by_page
            .entry(entry.page_id)
            .or_default()
            .insert(entry.lemma_id, entry.rank);
        Ok(())
    }

    fn entries_for_lemma(&self, lemma_id: LemmaId) -> Result<Vec<IndexEntry>, StoreError> {
        let tables = self.read()?;
        Ok(tables
            .by_lemma
            .get(&lemma_id)
            .map(|pages| {
                pages
                    .iter()
                    .map(|(&page_id, &rank)| IndexEntry {
                        lemma_id,
                        page_id,
                        rank,
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    fn entries_for_page(&self, page_id: PageId) -> Result<Vec<IndexEntry>, StoreError> {
        let tables = self.read()?;
        Ok(tables
            .by_page
            .get(&page_id)
            .map(|lemmas| {
                lemmas
                    .iter()
                    .map(|(&lemma_id, &rank)| IndexEntry {
                        lemma_id,
                        page_id,
                        rank,
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    fn find_entry(
        &self,
        lemma_id: LemmaId,
        page_id: PageId,
    ) -> Result<Option<IndexEntry>, StoreError> {
        let tables = self.read()?;
        Ok(tables
            .by_lemma
            .get(&lemma_id)
            .and_then(|pages| pages.get(&page_id))
            .map(|&rank| IndexEntry {
                lemma_id,
                page_id,
                rank,
            }))
    }

    fn delete_entries_for_lemma(&self, lemma_id: LemmaId) -> Result<usize, StoreError> {
        Ok(self.write()?.remove_entries_of_lemma(lemma_id))
    }

    fn counts(&self) -> Result<StoreCounts, StoreError> {
        let tables = self.read()?;
        let per_site = tables
            .sites
            .keys()
            .map(|&site_id| SiteCounts {
                site_id,
                pages: tables.pages.values().filter(|p| p.site_id == site_id).count(),
                lemmas: tables.lemmas.values().filter(|l| l.site_id == site_id).count(),
            })
            .collect();
        Ok(StoreCounts {
            sites: tables.sites.len(),
            pages: tables.pages.len(),
            lemmas: tables.lemmas.len(),
            entries: tables.by_page.values().map(|m| m.len()).sum(),
            per_site,
        })
    }
}
