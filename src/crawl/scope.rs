// src/crawl/scope.rs
// =============================================================================
// Decides which links found on a page are worth crawling.
//
// A link is followed only if ALL of these hold:
// 1. it contains no whitespace
// 2. it uses the same scheme as the page it was found on
// 3. it has more path segments than that page (the crawl only goes deeper)
// 4. it does not end in ".jpg"
// 5. its host equals the crawl root's host, ignoring a leading "www."
// 6. its last path segment has no "#" (in-page anchors are skipped)
//
// "Not visited yet" is the last rule; it lives in the session's visited set
// because checking and marking must happen in one step.
//
// Rust concepts:
// - Url: parsing, joining relative hrefs and reading host/scheme/segments
// - Option chaining with ? inside functions that return Option
// =============================================================================

use scraper::{Html, Selector};
use std::sync::OnceLock;
use url::Url;

fn anchor_selector() -> &'static Selector {
    static SELECTOR: OnceLock<Selector> = OnceLock::new();
    SELECTOR.get_or_init(|| Selector::parse("a[href]").expect("constant selector"))
}

/// Host without a leading "www.", lowercased.
pub fn bare_host(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    Some(host.strip_prefix("www.").unwrap_or(host).to_ascii_lowercase())
}

/// Number of non-empty path segments ("http://a.com/x/y/" -> 2).
pub fn path_depth(url: &Url) -> usize {
    url.path_segments()
        .map(|segments| segments.filter(|s| !s.is_empty()).count())
        .unwrap_or(0)
}

/// Path of `url` relative to the site root, as the text left after
/// removing the root. The root page itself (with or without a trailing
/// slash) is keyed by the configured root URL; a URL outside the root
/// keeps its full form.
pub fn page_path(url: &str, root: &str) -> String {
    if url.trim_end_matches('/') == root.trim_end_matches('/') {
        return root.to_string();
    }
    match url.strip_prefix(root) {
        // without a trailing slash on the root, the rest must start a path
        // or query, or "http://a.com" would also match "http://a.com.br"
        Some(rest) if root.ends_with('/') || rest.starts_with('/') || rest.starts_with('?') => {
            rest.to_string()
        }
        _ => url.to_string(),
    }
}

/// Scope of one site crawl.
#[derive(Debug, Clone)]
pub struct LinkScope {
    root_host: String,
}

impl LinkScope {
    pub fn new(root: &Url) -> Self {
        Self {
            root_host: bare_host(root).unwrap_or_default(),
        }
    }

    /// Checks rules 1-6 for an absolute `href` found on `page`.
    pub fn allows(&self, href: &str, page: &Url) -> bool {
        if href.chars().any(char::is_whitespace) {
            return false;
        }

        let link = match Url::parse(href) {
            Ok(link) => link,
            Err(_) => return false,
        };

        if link.scheme() != page.scheme() {
            return false;
        }

        if path_depth(&link) <= path_depth(page) {
            return false;
        }

        if href.ends_with(".jpg") {
            return false;
        }

        if bare_host(&link).as_deref() != Some(self.root_host.as_str()) {
            return false;
        }

        let last_segment = href.rsplit('/').next().unwrap_or("");
        !last_segment.contains('#')
    }
}

/// Every anchor href on the page, resolved to an absolute URL.
///
/// Hrefs containing whitespace are dropped before resolving, since
/// resolution would percent-encode the spaces away.
pub fn extract_links(html: &str, page: &Url) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut links = Vec::new();

    for element in document.select(anchor_selector()) {
        if let Some(href) = element.value().attr("href") {
            let href = href.trim();
            if href.chars().any(char::is_whitespace) {
                continue;
            }
            if let Some(absolute) = resolve_link(page, href) {
                links.push(absolute);
            }
        }
    }

    links
}

// Resolves a possibly-relative link against the page URL
fn resolve_link(base: &Url, href: &str) -> Option<String> {
    // Skip special protocols, they can never be crawled
    if href.is_empty()
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("javascript:")
    {
        return None;
    }

    base.join(href).ok().map(|url| url.to_string())
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why count path segments instead of comparing strings?
//    - "http://a.com/x/" and "http://a.com/x" are the same depth
//    - path_segments() splits the path for us; empty pieces come from
//      trailing slashes and are ignored
//
// 2. What does base.join(href) do?
//    - Resolves href the way a browser would
//    - "/docs" on "https://a.com/x/y" -> "https://a.com/docs"
//    - "z" on "https://a.com/x/y" -> "https://a.com/x/z"
//
// 3. Why OnceLock for the selector?
//    - Parsing a CSS selector costs time; every page needs the same one
//    - OnceLock builds it on first use and shares it afterwards
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn root() -> Url {
        Url::parse("http://site.com/").unwrap()
    }

    fn scope() -> LinkScope {
        LinkScope::new(&root())
    }

    #[test]
    fn fragment_in_last_segment_is_excluded() {
        assert!(!scope().allows("http://site.com/a/b#x", &root()));
    }

    #[test]
    fn external_host_is_excluded() {
        assert!(!scope().allows("http://other.com/x", &root()));
    }

    #[test]
    fn jpg_is_excluded() {
        assert!(!scope().allows("http://site.com/img.jpg", &root()));
    }

    #[test]
    fn same_depth_is_excluded() {
        let page = Url::parse("http://site.com/a").unwrap();
        assert!(!scope().allows("http://site.com/b", &page));
        assert!(!scope().allows("http://site.com/", &page));
        assert!(scope().allows("http://site.com/a/b", &page));
    }

    #[test]
    fn www_prefix_is_equivalent() {
        assert!(scope().allows("http://www.site.com/a/b", &root()));
        let www_root = LinkScope::new(&Url::parse("http://www.site.com").unwrap());
        assert!(www_root.allows("http://site.com/a", &root()));
    }

    #[test]
    fn scheme_must_match_page() {
        assert!(!scope().allows("https://site.com/a", &root()));
    }

    #[test]
    fn whitespace_and_garbage_are_excluded() {
        assert!(!scope().allows("http://site.com/a b", &root()));
        assert!(!scope().allows("not a url", &root()));
    }

    #[test]
    fn page_path_strips_root() {
        assert_eq!(page_path("http://site.com/a/b", "http://site.com/"), "a/b");
        assert_eq!(page_path("http://site.com/a/b", "http://site.com"), "/a/b");
        assert_eq!(page_path("http://site.com/?p=1", "http://site.com"), "/?p=1");
        // a longer host that merely starts with the root is not under it
        assert_eq!(
            page_path("http://site.com.br/x", "http://site.com"),
            "http://site.com.br/x"
        );
    }

    #[test]
    fn root_page_keeps_the_configured_url() {
        assert_eq!(page_path("http://site.com/", "http://site.com/"), "http://site.com/");
        assert_eq!(page_path("http://site.com", "http://site.com"), "http://site.com");
        // both spellings of the root page land on the same key
        assert_eq!(page_path("http://site.com/", "http://site.com"), "http://site.com");
        assert_eq!(page_path("http://site.com", "http://site.com/"), "http://site.com/");
    }

    #[test]
    fn depth_ignores_trailing_slash() {
        assert_eq!(path_depth(&Url::parse("http://a.com").unwrap()), 0);
        assert_eq!(path_depth(&Url::parse("http://a.com/x/").unwrap()), 1);
        assert_eq!(path_depth(&Url::parse("http://a.com/x/y").unwrap()), 2);
    }

    #[test]
    fn extract_links_resolves_and_skips() {
        let html = r#"
            <a href="/docs/intro">Docs</a>
            <a href="guide">Guide</a>
            <a href="mailto:me@site.com">Mail</a>
            <a href="/has space">Bad</a>
            <a>No href</a>
        "#;
        let page = Url::parse("http://site.com/docs/").unwrap();
        let links = extract_links(html, &page);
        assert_eq!(
            links,
            vec![
                "http://site.com/docs/intro".to_string(),
                "http://site.com/docs/guide".to_string(),
            ]
        );
    }
}
