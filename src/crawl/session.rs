// src/crawl/session.rs
// =============================================================================
// State shared by every unit of work crawling one site.
//
// A session owns:
// - the site row and its parsed root URL
// - the visited set: "check if seen, then mark" is a single locked step, so
//   two workers finding the same link never both schedule it
// - a cancellation token (child of the run's token) that every unit checks
//   before and while it waits
// - a TaskTracker that tells the orchestrator when the last unit is done,
//   including units spawned by other units
// - a semaphore capping concurrent fetches
//
// Rust concepts:
// - Arc<T>: the session is shared by every spawned task
// - Mutex<HashSet>: atomic check-and-insert
// - CancellationToken / TaskTracker from tokio-util
// =============================================================================

use super::fetch::PageFetcher;
use super::scope::LinkScope;
use super::worker;
use crate::config::AppConfig;
use crate::error::CrawlError;
use crate::index::Indexer;
use crate::lemma::Lemmatizer;
use crate::storage::{Site, Storage};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use url::Url;

/// Long-lived collaborators every unit needs, shared across sites and runs.
pub struct CrawlContext {
    pub store: Arc<dyn Storage>,
    pub fetcher: PageFetcher,
    pub lemmatizer: Arc<Lemmatizer>,
    pub indexer: Indexer,
}

impl CrawlContext {
    pub fn new(store: Arc<dyn Storage>, config: &AppConfig) -> Result<Self, CrawlError> {
        Ok(Self {
            fetcher: PageFetcher::new(&config.crawl)?,
            lemmatizer: Arc::new(Lemmatizer::russian()),
            indexer: Indexer::new(Arc::clone(&store), config.index.persist_empty_stem),
            store,
        })
    }
}

/// URLs already claimed by some unit of this session.
#[derive(Debug, Default)]
pub struct VisitedSet {
    urls: Mutex<HashSet<String>>,
}

impl VisitedSet {
    /// Marks `url` as visited. Returns false if it already was.
    pub fn claim(&self, url: &str) -> bool {
        match self.urls.lock() {
            Ok(mut urls) => urls.insert(url.to_string()),
            // a panicked worker leaves the set intact; keep using it
            Err(poisoned) => poisoned.into_inner().insert(url.to_string()),
        }
    }

    pub fn len(&self) -> usize {
        match self.urls.lock() {
            Ok(urls) => urls.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct CrawlSession {
    pub ctx: Arc<CrawlContext>,
    pub site: Site,
    pub root: Url,
    pub scope: LinkScope,
    pub visited: VisitedSet,
    /// Whether units schedule the links they find.
    pub discover_links: bool,
    cancel: CancellationToken,
    tracker: TaskTracker,
    permits: Arc<Semaphore>,
}

impl CrawlSession {
    pub fn new(
        ctx: Arc<CrawlContext>,
        site: Site,
        root: Url,
        cancel: CancellationToken,
        discover_links: bool,
        permits: Arc<Semaphore>,
    ) -> Self {
        let scope = LinkScope::new(&root);
        Self {
            ctx,
            site,
            root,
            scope,
            visited: VisitedSet::default(),
            discover_links,
            cancel,
            tracker: TaskTracker::new(),
            permits,
        }
    }

    pub fn is_active(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Waits for a fetch permit, giving up if the session is cancelled.
    pub async fn acquire_permit(&self, url: &str) -> Result<OwnedSemaphorePermit, CrawlError> {
        tokio::select! {
            _ = self.cancel.cancelled() => Err(CrawlError::Interrupted(url.to_string())),
            permit = self.permits.clone().acquire_owned() => {
                permit.map_err(|_| CrawlError::Interrupted(url.to_string()))
            }
        }
    }

    /// Spawns a unit for `url`. The caller must have claimed it.
    pub fn schedule(self: &Arc<Self>, url: String) {
        let session = Arc::clone(self);
        self.tracker.spawn(async move {
            match worker::process(Arc::clone(&session), url.clone()).await {
                Ok(outcome) => tracing::trace!(url = %url, ?outcome, "unit finished"),
                Err(CrawlError::Interrupted(_)) => {
                    tracing::debug!(url = %url, "unit interrupted")
                }
                Err(e) => tracing::warn!(url = %url, error = %e, "unit failed"),
            }
        });
    }

    /// Resolves once every scheduled unit, and every unit those spawned,
    /// has finished.
    pub async fn wait(&self) {
        // Units only spawn from inside other units, so closing first is safe:
        // the tracker still counts tasks spawned after close().
        self.tracker.close();
        self.tracker.wait().await;
    }

    /// Units still running.
    pub fn outstanding(&self) -> usize {
        self.tracker.len()
    }
}
