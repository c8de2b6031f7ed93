// src/crawl/orchestrator.rs
// =============================================================================
// Starts, stops and reports on indexing runs.
//
// A run walks the configured sites one after another. For each site it:
// 1. deletes everything stored under that site's URL
// 2. creates a fresh site row in INDEXING state
// 3. schedules the root URL and waits until no unit of the site is left
// 4. marks the site INDEXED, or FAILED if the run was stopped meanwhile
//
// Only one run may be active. `stop_indexing` cancels the run's token, which
// every unit observes, and marks any site still INDEXING as FAILED.
//
// `index_single_page` re-indexes one URL of a configured site without link
// discovery and without touching the active-run flag.
// =============================================================================

use super::scope::page_path;
use super::session::{CrawlContext, CrawlSession};
use super::worker::{self, UnitOutcome};
use crate::config::{AppConfig, SiteConfig};
use crate::error::{CrawlError, StoreError};
use crate::storage::{Site, SiteStatus, Storage};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use url::Url;

pub const ALREADY_STARTED: &str = "Indexing is already started";
pub const NOT_STARTED: &str = "Indexing is not started";
pub const STOPPED_BY_USER: &str = "Indexing stopped by user";
pub const OUTSIDE_CONFIGURED_SITES: &str =
    "This page is outside the sites listed in the configuration file";

/// Answer to a control request: success flag plus a message on refusal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ControlResponse {
    pub result: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ControlResponse {
    pub fn ok() -> Self {
        Self {
            result: true,
            error: None,
        }
    }

    pub fn refused(message: impl Into<String>) -> Self {
        Self {
            result: false,
            error: Some(message.into()),
        }
    }
}

// Handle on the run currently in flight
struct RunControl {
    cancel: CancellationToken,
    stop_requested: Arc<AtomicBool>,
}

struct ServiceInner {
    config: AppConfig,
    ctx: Arc<CrawlContext>,
    active: AtomicBool,
    run: Mutex<Option<RunControl>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Entry point for everything that changes the index.
#[derive(Clone)]
pub struct IndexingService {
    inner: Arc<ServiceInner>,
}

impl IndexingService {
    pub fn new(config: AppConfig, store: Arc<dyn Storage>) -> Result<Self, CrawlError> {
        let ctx = Arc::new(CrawlContext::new(store, &config)?);
        Ok(Self {
            inner: Arc::new(ServiceInner {
                config,
                ctx,
                active: AtomicBool::new(false),
                run: Mutex::new(None),
                handle: Mutex::new(None),
            }),
        })
    }

    pub fn is_indexing(&self) -> bool {
        self.inner.active.load(Ordering::SeqCst)
    }

    /// Launches a background run over every configured site.
    /// Must be called from within a tokio runtime.
    pub fn start_indexing(&self) -> ControlResponse {
        if self
            .inner
            .active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return ControlResponse::refused(ALREADY_STARTED);
        }

        let cancel = CancellationToken::new();
        let stop_requested = Arc::new(AtomicBool::new(false));
        *lock(&self.inner.run) = Some(RunControl {
            cancel: cancel.clone(),
            stop_requested: Arc::clone(&stop_requested),
        });

        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move {
            inner.run_all(&cancel, &stop_requested).await;
            inner.finish_run(&stop_requested);
        });
        *lock(&self.inner.handle) = Some(handle);

        tracing::info!(sites = self.inner.config.sites.len(), "indexing started");
        ControlResponse::ok()
    }

    /// Cancels the active run. Sites still being indexed become FAILED.
    pub fn stop_indexing(&self) -> Result<ControlResponse, StoreError> {
        if !self.inner.active.swap(false, Ordering::SeqCst) {
            return Ok(ControlResponse::refused(NOT_STARTED));
        }

        if let Some(run) = lock(&self.inner.run).as_ref() {
            run.stop_requested.store(true, Ordering::SeqCst);
            run.cancel.cancel();
        }

        let store = &self.inner.ctx.store;
        for site in store.all_sites()? {
            if site.status == SiteStatus::Indexing {
                store.set_site_status(site.id, SiteStatus::Failed, Some(STOPPED_BY_USER.into()))?;
            }
        }

        tracing::info!("indexing stopped by user");
        Ok(ControlResponse::ok())
    }

    /// Resolves when the most recently started run has finished.
    pub async fn wait(&self) {
        let handle = lock(&self.inner.handle).take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "indexing run panicked");
            }
        }
    }

    /// Fetches and indexes one URL belonging to a configured site.
    pub async fn index_single_page(&self, url: &str) -> Result<ControlResponse, CrawlError> {
        let Some(site_config) = self.inner.config.site_for_url(url) else {
            return Ok(ControlResponse::refused(OUTSIDE_CONFIGURED_SITES));
        };
        let page_url = Url::parse(url).map_err(|source| CrawlError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;

        let store = &self.inner.ctx.store;
        let existing = store
            .find_sites_by_url(&site_config.url)?
            .into_iter()
            .find(|site| site.url == site_config.url);
        let (site, prior_status, prior_error) = match existing {
            Some(site) => {
                let (status, error) = (site.status, site.last_error.clone());
                (site, status, error)
            }
            None => {
                let site = store.upsert_site(Site::new(&site_config.url, &site_config.name))?;
                (site, SiteStatus::Failed, None)
            }
        };

        let site_id = site.id;
        store.set_site_status(site_id, SiteStatus::Indexing, prior_error.clone())?;
        let outcome = self.inner.refresh_page(site, page_url).await;
        // restored even when the refresh failed
        store.set_site_status(site_id, prior_status, prior_error)?;

        match outcome? {
            UnitOutcome::Unreachable => tracing::warn!(url, "page could not be fetched"),
            other => tracing::info!(url, ?other, "page indexed"),
        }
        Ok(ControlResponse::ok())
    }
}

impl ServiceInner {
    // Drops the stored copy of the page, then fetches and indexes it again
    async fn refresh_page(&self, site: Site, page_url: Url) -> Result<UnitOutcome, CrawlError> {
        let path = page_path(page_url.as_str(), &site.url);
        self.ctx.indexer.forget_page(site.id, &path)?;

        let root = Url::parse(&site.url).unwrap_or_else(|_| page_url.clone());
        let session = Arc::new(CrawlSession::new(
            Arc::clone(&self.ctx),
            site,
            root,
            CancellationToken::new(),
            false,
            Arc::new(Semaphore::new(1)),
        ));
        worker::process(session, page_url.to_string()).await
    }

    async fn run_all(&self, cancel: &CancellationToken, stop_requested: &AtomicBool) {
        let permits = Arc::new(Semaphore::new(self.config.crawl.max_concurrent_fetches));

        for site_config in &self.config.sites {
            if cancel.is_cancelled() {
                tracing::info!(site = %site_config.url, "run stopped, site skipped");
                break;
            }
            match self
                .crawl_site(site_config, cancel, stop_requested, &permits)
                .await
            {
                Ok(status) => tracing::info!(site = %site_config.url, %status, "site finished"),
                Err(e) => {
                    tracing::error!(site = %site_config.url, error = %e, "site failed");
                    self.mark_failed(&site_config.url, &e.to_string());
                }
            }
        }
    }

    async fn crawl_site(
        &self,
        site_config: &SiteConfig,
        cancel: &CancellationToken,
        stop_requested: &AtomicBool,
        permits: &Arc<Semaphore>,
    ) -> Result<SiteStatus, CrawlError> {
        let store = &self.ctx.store;
        let removed = store.delete_sites_by_url(&site_config.url)?;
        if removed > 0 {
            tracing::debug!(site = %site_config.url, removed, "previous index dropped");
        }
        let site = store.upsert_site(Site::new(&site_config.url, &site_config.name))?;
        let site_id = site.id;
        let root = Url::parse(&site_config.url).map_err(|source| CrawlError::InvalidUrl {
            url: site_config.url.clone(),
            source,
        })?;

        let session = Arc::new(CrawlSession::new(
            Arc::clone(&self.ctx),
            site,
            root,
            cancel.child_token(),
            true,
            Arc::clone(permits),
        ));
        session.visited.claim(&site_config.url);
        session.schedule(site_config.url.clone());
        session.wait().await;

        let status = if stop_requested.load(Ordering::SeqCst) {
            store.set_site_status(site_id, SiteStatus::Failed, Some(STOPPED_BY_USER.into()))?;
            SiteStatus::Failed
        } else {
            store.set_site_status(site_id, SiteStatus::Indexed, None)?;
            SiteStatus::Indexed
        };
        tracing::debug!(site = %site_config.url, visited = session.visited.len(), "site crawl done");
        Ok(status)
    }

    fn mark_failed(&self, url: &str, message: &str) {
        let store = &self.ctx.store;
        let result = store.find_sites_by_url(url).and_then(|sites| {
            sites
                .into_iter()
                .filter(|site| site.url == url)
                .try_for_each(|site| {
                    store.set_site_status(site.id, SiteStatus::Failed, Some(message.to_string()))
                })
        });
        if let Err(e) = result {
            tracing::error!(site = %url, error = %e, "could not record failure");
        }
    }

    // Clears the active flag, unless a newer run has replaced this one
    fn finish_run(&self, stop_requested: &Arc<AtomicBool>) {
        let mut run = lock(&self.run);
        let current = run
            .as_ref()
            .is_some_and(|r| Arc::ptr_eq(&r.stop_requested, stop_requested));
        if current {
            *run = None;
            self.active.store(false, Ordering::SeqCst);
            tracing::info!("indexing run finished");
        }
    }
}
