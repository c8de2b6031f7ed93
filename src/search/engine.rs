// src/search/engine.rs
// =============================================================================
// Resolves a free-text query into ranked, annotated pages.
//
// How it works:
// 1. Lemmatize the query; function words and garbage tokens drop out
// 2. Look up every query lemma's rows across all sites (one row per site)
// 3. Keep only rows of sites matching the optional URL filter
// 4. Drop very common rows, but always keep at least one
// 5. Intersect the pages of all remaining query terms
// 6. Score each page by the sum of its ranks, relative to the best page
// 7. Cut the requested slice and attach title and snippet
//
// Every "nothing found" case comes back as SearchOutcome::NoResults; only
// storage failures are errors.
// =============================================================================

use super::result::{extract_title, SearchOutcome, SearchResult};
use crate::config::{Pagination, SearchSettings};
use crate::error::StoreError;
use crate::lemma::{remove_punctuation, Lemmatizer, SnippetBuilder};
use crate::storage::{Lemma, LemmaId, PageId, Site, SiteId, Storage};
use std::collections::HashMap;
use std::sync::Arc;

// Lemma rows of one query word, plus the rank of that word on each page
struct QueryTerm {
    rows: Vec<Lemma>,
    ranks: HashMap<PageId, u32>,
}

impl QueryTerm {
    fn frequency(&self) -> u64 {
        self.rows.iter().map(|row| u64::from(row.frequency)).sum()
    }
}

pub struct SearchEngine {
    store: Arc<dyn Storage>,
    lemmatizer: Arc<Lemmatizer>,
    snippets: SnippetBuilder,
    settings: SearchSettings,
}

impl SearchEngine {
    pub fn new(store: Arc<dyn Storage>, lemmatizer: Arc<Lemmatizer>, settings: SearchSettings) -> Self {
        let snippets = SnippetBuilder::new(settings.words_around, settings.emphasis.clone());
        Self {
            store,
            lemmatizer,
            snippets,
            settings,
        }
    }

    /// Runs a query. `limit` falls back to the configured default.
    pub fn search(
        &self,
        query: &str,
        offset: usize,
        limit: Option<usize>,
        site_filter: Option<&str>,
    ) -> Result<SearchOutcome, StoreError> {
        let stems = self.query_stems(query);
        if stems.is_empty() {
            tracing::debug!(query, "query has no searchable words");
            return Ok(SearchOutcome::NoResults);
        }

        let sites: HashMap<SiteId, Site> = self
            .store
            .all_sites()?
            .into_iter()
            .map(|site| (site.id, site))
            .collect();

        let mut terms = Vec::with_capacity(stems.len());
        for stem in &stems {
            let mut rows = self.store.find_lemmas(stem)?;
            if let Some(filter) = site_filter {
                rows.retain(|row| sites.get(&row.site_id).is_some_and(|s| s.url.contains(filter)));
            }
            if rows.is_empty() {
                tracing::debug!(query, stem = %stem, "no lemma rows for query word");
                return Ok(SearchOutcome::NoResults);
            }
            terms.push(rows);
        }

        let terms = self.prune_frequent(terms);
        let mut terms = terms
            .into_iter()
            .map(|rows| self.load_ranks(rows))
            .collect::<Result<Vec<_>, _>>()?;
        terms.sort_by_key(|term| std::cmp::Reverse(term.frequency()));

        let Some((first, rest)) = terms.split_first() else {
            return Ok(SearchOutcome::NoResults);
        };
        let mut scored: Vec<(PageId, u32)> = first
            .ranks
            .iter()
            .filter_map(|(&page_id, &rank)| {
                rest.iter()
                    .try_fold(rank, |sum, term| term.ranks.get(&page_id).map(|r| sum + r))
                    .map(|total| (page_id, total))
            })
            .collect();
        if scored.is_empty() {
            return Ok(SearchOutcome::NoResults);
        }

        let max = scored.iter().map(|&(_, abs)| abs).max().unwrap_or(1).max(1);
        scored.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

        let total = scored.len();
        let limit = limit.unwrap_or(self.settings.default_limit);
        let upper = match self.settings.pagination {
            Pagination::Absolute => limit.min(total),
            Pagination::Window => offset.saturating_add(limit).min(total),
        };

        let mut results = Vec::new();
        for &(page_id, absolute) in scored.get(offset..upper).unwrap_or(&[]) {
            let Some(page) = self.store.page(page_id)? else {
                continue;
            };
            let Some(site) = sites.get(&page.site_id) else {
                continue;
            };
            let content = page.content.as_deref().unwrap_or("");
            results.push(SearchResult {
                site: site.url.clone(),
                site_name: site.name.clone(),
                uri: page.path.clone(),
                title: extract_title(content),
                snippet: self.snippets.build(&self.lemmatizer, content, query),
                relevance: f64::from(absolute) / f64::from(max),
            });
        }

        tracing::info!(query, total, returned = results.len(), "search done");
        Ok(SearchOutcome::Found { total, results })
    }

    // Distinct non-empty lemmas of the query, in query order
    fn query_stems(&self, query: &str) -> Vec<String> {
        let cleaned = remove_punctuation(&query.to_lowercase());
        let mut stems: Vec<String> = Vec::new();
        for word in cleaned.split_whitespace() {
            let stem = self.lemmatizer.lemma(word);
            if !stem.is_empty() && !stems.contains(&stem) {
                stems.push(stem);
            }
        }
        stems
    }

    // Removes rows above the frequency threshold, most frequent first, so
    // that at least one row is left. Terms losing every row leave the query.
    fn prune_frequent(&self, terms: Vec<Vec<Lemma>>) -> Vec<Vec<Lemma>> {
        let threshold = self.settings.high_frequency_threshold;
        let remaining: usize = terms.iter().map(Vec::len).sum();

        let mut frequent: Vec<(usize, &Lemma)> = terms
            .iter()
            .enumerate()
            .flat_map(|(t, rows)| rows.iter().map(move |row| (t, row)))
            .filter(|(_, row)| row.frequency > threshold)
            .collect();
        frequent.sort_by_key(|(_, row)| std::cmp::Reverse(row.frequency));
        let dropped: Vec<(usize, LemmaId)> = frequent
            .into_iter()
            .take(remaining.saturating_sub(1))
            .map(|(t, row)| (t, row.id))
            .collect();
        if !dropped.is_empty() {
            tracing::debug!(dropped = dropped.len(), "frequent lemmas ignored");
        }

        terms
            .into_iter()
            .enumerate()
            .map(|(t, rows)| {
                rows.into_iter()
                    .filter(|row| !dropped.contains(&(t, row.id)))
                    .collect::<Vec<_>>()
            })
            .filter(|rows| !rows.is_empty())
            .collect()
    }

    fn load_ranks(&self, rows: Vec<Lemma>) -> Result<QueryTerm, StoreError> {
        let mut ranks = HashMap::new();
        for row in &rows {
            for entry in self.store.entries_for_lemma(row.id)? {
                ranks.entry(entry.page_id).or_insert(entry.rank);
            }
        }
        Ok(QueryTerm { rows, ranks })
    }
}
