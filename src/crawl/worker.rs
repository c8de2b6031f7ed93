// src/crawl/worker.rs
// =============================================================================
// One unit of crawl work: fetch a URL, store and index the page, then
// schedule the links it contains.
//
// How it works:
// 1. Stop early if the session was cancelled
// 2. Wait for a fetch permit and a random polite delay
// 3. Fetch the page (cancellation interrupts the wait and the request)
// 4. Drop whatever was stored for the same path before, then save the page
//    (HTML for 2xx, no content for error statuses) and touch the site
// 5. Count lemmas and fold them into the index
// 6. Claim every in-scope link and spawn a unit for it
//
// A failed fetch (DNS, TLS, non-HTML...) stores nothing and ends the branch.
// =============================================================================

use super::fetch::FetchOutcome;
use super::scope::{extract_links, page_path};
use super::session::CrawlSession;
use crate::error::CrawlError;
use crate::storage::Page;
use std::sync::Arc;
use url::Url;

/// What a unit did with its URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitOutcome {
    /// The session was no longer active.
    Skipped,
    /// Page stored and indexed; `scheduled` new units were spawned.
    Indexed {
        path: String,
        lemmas: usize,
        scheduled: usize,
    },
    /// Page stored with an error status and no content.
    ErrorStatus { path: String, code: u16 },
    /// Nothing usable came back; nothing was stored.
    Unreachable,
}

pub async fn process(session: Arc<CrawlSession>, url: String) -> Result<UnitOutcome, CrawlError> {
    if !session.is_active() {
        return Ok(UnitOutcome::Skipped);
    }

    let page_url = Url::parse(&url).map_err(|source| CrawlError::InvalidUrl {
        url: url.clone(),
        source,
    })?;
    let path = page_path(&url, &session.site.url);
    let ctx = &session.ctx;
    let cancel = session.cancel_token();

    let _permit = session.acquire_permit(&url).await?;

    tokio::select! {
        _ = cancel.cancelled() => return Err(CrawlError::Interrupted(url.clone())),
        _ = tokio::time::sleep(ctx.fetcher.polite_delay()) => {}
    }

    tracing::info!(url = %url, "fetching");
    let fetched = tokio::select! {
        _ = cancel.cancelled() => return Err(CrawlError::Interrupted(url.clone())),
        result = ctx.fetcher.fetch(&url) => result,
    };

    let (code, content) = match fetched {
        Ok(FetchOutcome::Page { code, body }) => (code, Some(body)),
        Ok(FetchOutcome::Status(code)) => {
            tracing::warn!(url = %url, code, "error status");
            (code, None)
        }
        Err(e) => {
            tracing::warn!(url = %url, error = %e, "fetch failed");
            return Ok(UnitOutcome::Unreachable);
        }
    };

    let site_id = session.site.id;
    if ctx.indexer.forget_page(site_id, &path)? {
        tracing::debug!(path = %path, "replacing stored page");
    }
    let page = ctx.store.save_page(Page {
        id: 0,
        site_id,
        path: path.clone(),
        code,
        content,
    })?;
    ctx.store.touch_site(site_id)?;

    let Some(html) = page.content.as_deref() else {
        return Ok(UnitOutcome::ErrorStatus { path, code });
    };

    let counts = ctx.lemmatizer.count_lemmas(html);
    let lemmas = ctx.indexer.apply(site_id, &page, &counts)?;

    let mut scheduled = 0;
    if session.discover_links && session.is_active() {
        for link in extract_links(html, &page_url) {
            if session.scope.allows(&link, &page_url) && session.visited.claim(&link) {
                session.schedule(link);
                scheduled += 1;
            }
        }
    }

    Ok(UnitOutcome::Indexed {
        path,
        lemmas,
        scheduled,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AppConfig, CrawlSettings};
    use crate::crawl::session::CrawlContext;
    use crate::storage::{MemoryStore, Site, Storage};
    use tokio::sync::Semaphore;
    use tokio_util::sync::CancellationToken;
    use wiremock::matchers::{method, path as url_path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn html(body: &str) -> ResponseTemplate {
        ResponseTemplate::new(200)
            .insert_header("content-type", "text/html")
            .set_body_string(format!("<html><body>{body}</body></html>"))
    }

    fn quick_config() -> AppConfig {
        AppConfig {
            crawl: CrawlSettings {
                delay_ms: (0, 0),
                ..CrawlSettings::default()
            },
            ..AppConfig::default()
        }
    }

    fn session(
        store: &Arc<MemoryStore>,
        root: &str,
        discover_links: bool,
        cancel: CancellationToken,
    ) -> Arc<CrawlSession> {
        let store_dyn: Arc<dyn Storage> = store.clone();
        let ctx = Arc::new(CrawlContext::new(store_dyn, &quick_config()).unwrap());
        let site = store.upsert_site(Site::new(root, "Test")).unwrap();
        Arc::new(CrawlSession::new(
            ctx,
            site,
            Url::parse(root).unwrap(),
            cancel,
            discover_links,
            Arc::new(Semaphore::new(4)),
        ))
    }

    async fn site_server() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(url_path("/"))
            .respond_with(html(
                r##"<p>cats and dogs</p>
                   <a href="/docs">Docs</a>
                   <a href="/docs#top">Top</a>
                   <a href="/pic.jpg">Picture</a>
                   <a href="http://other.example/x">Elsewhere</a>"##,
            ))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(url_path("/docs"))
            .respond_with(html(
                r#"<p>cats cats cats</p>
                   <a href="/docs/intro">Intro</a>
                   <a href="/">Home</a>"#,
            ))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(url_path("/docs/intro"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn crawl_follows_in_scope_links_once() {
        let server = site_server().await;
        let store = Arc::new(MemoryStore::new());
        let root = server.uri();
        let session = session(&store, &root, true, CancellationToken::new());

        assert!(session.visited.claim(&root));
        session.schedule(root.clone());
        session.wait().await;

        let site_id = session.site.id;
        let home = store.find_page(site_id, &root).unwrap().unwrap();
        assert_eq!(home.code, 200);
        let docs = store.find_page(site_id, "/docs").unwrap().unwrap();
        assert!(docs.content.unwrap().contains("cats cats cats"));
        let intro = store.find_page(site_id, "/docs/intro").unwrap().unwrap();
        assert_eq!(intro.code, 404);
        assert!(intro.content.is_none());

        let cats = store.find_lemma(site_id, "cats").unwrap().unwrap();
        assert_eq!(cats.frequency, 2);
        assert_eq!(store.find_entry(cats.id, docs.id).unwrap().unwrap().rank, 3);
        assert_eq!(session.outstanding(), 0);
    }

    #[tokio::test]
    async fn single_unit_does_not_discover() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(url_path("/"))
            .respond_with(html(r#"<p>owls</p><a href="/next">Next</a>"#))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(url_path("/next"))
            .respond_with(html("<p>never</p>"))
            .expect(0)
            .mount(&server)
            .await;

        let store = Arc::new(MemoryStore::new());
        let session = session(&store, &server.uri(), false, CancellationToken::new());
        let outcome = process(session.clone(), server.uri()).await.unwrap();

        assert!(matches!(outcome, UnitOutcome::Indexed { scheduled: 0, lemmas: 2, .. }));
    }

    #[tokio::test]
    async fn refetch_replaces_page_without_double_counting() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(url_path("/"))
            .respond_with(html("<p>owls owls</p>"))
            .mount(&server)
            .await;

        let store = Arc::new(MemoryStore::new());
        let session = session(&store, &server.uri(), false, CancellationToken::new());
        process(session.clone(), server.uri()).await.unwrap();
        process(session.clone(), server.uri()).await.unwrap();

        let owls = store.find_lemma(session.site.id, "owls").unwrap().unwrap();
        assert_eq!(owls.frequency, 1);
        assert_eq!(store.entries_for_lemma(owls.id).unwrap().len(), 1);
        assert_eq!(store.counts().unwrap().pages, 1);
    }

    #[tokio::test]
    async fn cancelled_session_skips_work() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(html("<p>owls</p>"))
            .expect(0)
            .mount(&server)
            .await;

        let store = Arc::new(MemoryStore::new());
        let cancel = CancellationToken::new();
        let session = session(&store, &server.uri(), true, cancel.clone());
        cancel.cancel();

        let outcome = process(session, server.uri()).await.unwrap();
        assert_eq!(outcome, UnitOutcome::Skipped);
        assert_eq!(store.counts().unwrap().pages, 0);
    }

    #[tokio::test]
    async fn unreachable_page_stores_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "application/pdf")
                    .set_body_bytes(b"%PDF-1.4".to_vec()),
            )
            .mount(&server)
            .await;

        let store = Arc::new(MemoryStore::new());
        let session = session(&store, &server.uri(), true, CancellationToken::new());
        let outcome = process(session, server.uri()).await.unwrap();

        assert_eq!(outcome, UnitOutcome::Unreachable);
        assert_eq!(store.counts().unwrap().pages, 0);
    }
}
