// src/index.rs
// =============================================================================
// Keeps lemma frequencies and index entries in step with the stored pages.
//
// apply():   page was fetched  -> +1 frequency per distinct lemma, one entry
//                                 per lemma with rank = occurrences
// retract(): page goes away    -> -1 frequency per lemma of the page
//                                 (lemma deleted when it reaches zero)
//
// After either call, every lemma's frequency equals the number of index
// entries pointing at it.
// =============================================================================

use crate::error::StoreError;
use crate::storage::{IndexEntry, Page, SiteId, Storage};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone)]
pub struct Indexer {
    store: Arc<dyn Storage>,
    persist_empty_stem: bool,
}

impl Indexer {
    pub fn new(store: Arc<dyn Storage>, persist_empty_stem: bool) -> Self {
        Self {
            store,
            persist_empty_stem,
        }
    }

    /// Folds the lemma counts of one page into the index. Returns how many
    /// lemmas were recorded.
    pub fn apply(
        &self,
        site_id: SiteId,
        page: &Page,
        lemma_counts: &HashMap<String, usize>,
    ) -> Result<usize, StoreError> {
        let mut recorded = 0;
        for (stem, &count) in lemma_counts {
            if stem.is_empty() && !self.persist_empty_stem {
                continue;
            }
            let lemma = self.store.increment_lemma(site_id, stem)?;
            self.store.save_entry(IndexEntry {
                lemma_id: lemma.id,
                page_id: page.id,
                rank: u32::try_from(count).unwrap_or(u32::MAX),
            })?;
            recorded += 1;
        }
        tracing::debug!(page = %page.path, lemmas = recorded, "page indexed");
        Ok(recorded)
    }

    /// Reverses the contribution of `page` to its lemmas' frequencies.
    /// The page's own entries are left for the page deletion to remove.
    pub fn retract(&self, page: &Page) -> Result<(), StoreError> {
        for entry in self.store.entries_for_page(page.id)? {
            if self.store.decrement_lemma(entry.lemma_id)?.is_none() {
                tracing::trace!(lemma_id = entry.lemma_id, "lemma dropped");
            }
        }
        Ok(())
    }

    /// Retracts and deletes the page stored at (site, path), if any.
    /// Returns whether a page was removed.
    pub fn forget_page(&self, site_id: SiteId, path: &str) -> Result<bool, StoreError> {
        let Some(page) = self.store.find_page(site_id, path)? else {
            return Ok(false);
        };
        self.retract(&page)?;
        self.store.delete_page(site_id, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn setup() -> (Arc<MemoryStore>, Indexer) {
        let store = Arc::new(MemoryStore::new());
        let indexer = Indexer::new(store.clone(), false);
        (store, indexer)
    }

    fn stored_page(store: &MemoryStore, path: &str) -> Page {
        store
            .save_page(Page {
                id: 0,
                site_id: 1,
                path: path.into(),
                code: 200,
                content: Some(String::new()),
            })
            .unwrap()
    }

    fn counts(pairs: &[(&str, usize)]) -> HashMap<String, usize> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    /// Every lemma's frequency equals the number of entries referencing it.
    fn assert_frequencies_consistent(store: &MemoryStore, texts: &[&str]) {
        for text in texts {
            for lemma in store.find_lemmas(text).unwrap() {
                let entries = store.entries_for_lemma(lemma.id).unwrap().len();
                assert_eq!(lemma.frequency as usize, entries, "lemma {text}");
            }
        }
    }

    #[test]
    fn frequency_counts_pages_not_occurrences() {
        let (store, indexer) = setup();
        let a = stored_page(&store, "/a");
        let b = stored_page(&store, "/b");
        indexer.apply(1, &a, &counts(&[("cat", 3)])).unwrap();
        indexer.apply(1, &b, &counts(&[("cat", 1), ("dog", 2)])).unwrap();

        let cat = store.find_lemma(1, "cat").unwrap().unwrap();
        assert_eq!(cat.frequency, 2);
        assert_eq!(store.find_entry(cat.id, a.id).unwrap().unwrap().rank, 3);
        assert_eq!(store.find_entry(cat.id, b.id).unwrap().unwrap().rank, 1);
        assert_frequencies_consistent(&store, &["cat", "dog"]);
    }

    #[test]
    fn empty_stem_is_skipped_unless_enabled() {
        let (store, indexer) = setup();
        let a = stored_page(&store, "/a");
        let recorded = indexer.apply(1, &a, &counts(&[("", 4), ("cat", 1)])).unwrap();
        assert_eq!(recorded, 1);
        assert!(store.find_lemma(1, "").unwrap().is_none());

        let keeping = Indexer::new(store.clone(), true);
        let b = stored_page(&store, "/b");
        keeping.apply(1, &b, &counts(&[("", 4)])).unwrap();
        assert_eq!(store.find_lemma(1, "").unwrap().unwrap().frequency, 1);
    }

    #[test]
    fn forget_page_restores_previous_state() {
        let (store, indexer) = setup();
        let a = stored_page(&store, "/a");
        let b = stored_page(&store, "/b");
        indexer.apply(1, &a, &counts(&[("cat", 3), ("owl", 1)])).unwrap();
        indexer.apply(1, &b, &counts(&[("cat", 1)])).unwrap();

        assert!(indexer.forget_page(1, "/a").unwrap());
        assert_eq!(store.find_lemma(1, "cat").unwrap().unwrap().frequency, 1);
        assert!(store.find_lemma(1, "owl").unwrap().is_none());
        assert!(store.find_page(1, "/a").unwrap().is_none());
        assert_frequencies_consistent(&store, &["cat", "owl"]);

        assert!(!indexer.forget_page(1, "/a").unwrap());
    }

    #[test]
    fn concurrent_apply_keeps_frequencies_exact() {
        let (store, indexer) = setup();
        let pages: Vec<Page> = (0..16)
            .map(|i| stored_page(&store, &format!("/p{i}")))
            .collect();
        let handles: Vec<_> = pages
            .into_iter()
            .map(|page| {
                let indexer = indexer.clone();
                std::thread::spawn(move || {
                    indexer
                        .apply(1, &page, &counts(&[("cat", 2), ("dog", 1)]))
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.find_lemma(1, "cat").unwrap().unwrap().frequency, 16);
        assert_frequencies_consistent(&store, &["cat", "dog"]);
    }
}
