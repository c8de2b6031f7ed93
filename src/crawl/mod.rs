// src/crawl/mod.rs
// =============================================================================
// This module handles website crawling and indexing runs.
//
// Features:
// - Concurrent crawling of each configured site from its root URL
// - Scope rules that keep the crawl on the site and moving deeper
// - Polite crawling: random delay before each request, bounded concurrency
// - Cooperative stop: every unit checks the run's cancellation token
//
// Layout:
// - scope: which links to follow, page paths, link extraction
// - fetch: the HTTP side (headers, delay, content checks)
// - session: per-site shared state (visited set, task tracking)
// - worker: one fetch + store + index + discover step
// - orchestrator: start/stop/single-page control surface
// =============================================================================

mod fetch;
mod orchestrator;
mod scope;
mod session;
mod worker;

pub use fetch::{FetchError, FetchOutcome, PageFetcher};
pub use orchestrator::{
    ControlResponse, IndexingService, ALREADY_STARTED, NOT_STARTED, OUTSIDE_CONFIGURED_SITES,
    STOPPED_BY_USER,
};
pub use scope::{bare_host, extract_links, page_path, path_depth, LinkScope};
pub use session::{CrawlContext, CrawlSession, VisitedSet};
pub use worker::{process, UnitOutcome};
