// src/statistics.rs
// =============================================================================
// Summary of what is currently indexed.
//
// Totals cover every site in the store; the detail list has one entry per
// site with its status and row counts. Serialises to JSON for `stats --json`.
// =============================================================================

use crate::error::StoreError;
use crate::storage::{SiteStatus, Storage};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TotalStatistics {
    pub sites: usize,
    pub pages: usize,
    pub lemmas: usize,
    pub indexing: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteStatistics {
    pub url: String,
    pub name: String,
    pub status: SiteStatus,
    pub status_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub pages: usize,
    pub lemmas: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Statistics {
    pub total: TotalStatistics,
    pub detailed: Vec<SiteStatistics>,
}

impl Statistics {
    /// Collects counts from the store. `indexing` says whether a run is active.
    pub fn collect(store: &dyn Storage, indexing: bool) -> Result<Self, StoreError> {
        let counts = store.counts()?;
        let per_site: HashMap<_, _> = counts
            .per_site
            .iter()
            .map(|c| (c.site_id, (c.pages, c.lemmas)))
            .collect();

        let detailed = store
            .all_sites()?
            .into_iter()
            .map(|site| {
                let (pages, lemmas) = per_site.get(&site.id).copied().unwrap_or((0, 0));
                SiteStatistics {
                    url: site.url,
                    name: site.name,
                    status: site.status,
                    status_time: site.status_time,
                    error: site.last_error,
                    pages,
                    lemmas,
                }
            })
            .collect();

        Ok(Self {
            total: TotalStatistics {
                sites: counts.sites,
                pages: counts.pages,
                lemmas: counts.lemmas,
                indexing,
            },
            detailed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStore, Page, Site};

    #[test]
    fn totals_and_detail_match_store() {
        let store = MemoryStore::new();
        let a = store.upsert_site(Site::new("http://a.com", "A")).unwrap();
        let b = store.upsert_site(Site::new("http://b.com", "B")).unwrap();
        store
            .set_site_status(b.id, SiteStatus::Failed, Some("boom".into()))
            .unwrap();
        store
            .save_page(Page {
                id: 0,
                site_id: a.id,
                path: "/x".into(),
                code: 200,
                content: Some("<p>x</p>".into()),
            })
            .unwrap();
        store.increment_lemma(a.id, "x").unwrap();

        let stats = Statistics::collect(&store, true).unwrap();
        assert_eq!(
            stats.total,
            TotalStatistics {
                sites: 2,
                pages: 1,
                lemmas: 1,
                indexing: true
            }
        );
        let site_a = stats.detailed.iter().find(|s| s.name == "A").unwrap();
        assert_eq!((site_a.pages, site_a.lemmas), (1, 1));
        let site_b = stats.detailed.iter().find(|s| s.name == "B").unwrap();
        assert_eq!(site_b.status, SiteStatus::Failed);
        assert_eq!(site_b.error.as_deref(), Some("boom"));
        assert_eq!((site_b.pages, site_b.lemmas), (0, 0));
    }

    #[test]
    fn json_shape() {
        let store = MemoryStore::new();
        store.upsert_site(Site::new("http://a.com", "A")).unwrap();
        let json = serde_json::to_value(Statistics::collect(&store, false).unwrap()).unwrap();
        assert_eq!(json["total"]["indexing"], false);
        assert_eq!(json["detailed"][0]["status"], "INDEXING");
        assert!(json["detailed"][0].get("statusTime").is_some());
        assert!(json["detailed"][0].get("error").is_none());
    }
}
