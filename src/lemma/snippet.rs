// src/lemma/snippet.rs
// =============================================================================
// Builds the short text fragment shown under each search result.
//
// How it works:
// 1. Collect the visible words of the page body (scripts, styles and <head>
//    are skipped)
// 2. Lemmatize every word and every query word, position by position
// 3. Find the first page word whose lemma contains the first query lemma
// 4. Cut a window of `words_around` words on each side of it and wrap the
//    words matching the query in emphasis markers
//
// The page is lemmatized again here, independently of indexing, so a page
// can match the index yet produce no snippet.
// =============================================================================

use super::text::Lemmatizer;
use scraper::Html;

const HIDDEN_ELEMENTS: [&str; 5] = ["script", "style", "noscript", "head", "template"];
const ELLIPSIS: &str = "...";

/// Visible words of an HTML document, in document order.
fn visible_words(content: &str) -> Vec<String> {
    let document = Html::parse_document(content);
    let mut words = Vec::new();

    for node in document.root_element().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|element| HIDDEN_ELEMENTS.contains(&element.name()))
        });
        if !hidden {
            words.extend(text.split_whitespace().map(str::to_string));
        }
    }

    words
}

#[derive(Debug, Clone)]
pub struct SnippetBuilder {
    words_around: usize,
    open: String,
    close: String,
}

impl SnippetBuilder {
    pub fn new(words_around: usize, emphasis: (String, String)) -> Self {
        Self {
            words_around,
            open: emphasis.0,
            close: emphasis.1,
        }
    }

    /// Snippet for `query` inside `content`, or `None` when the first query
    /// lemma does not occur in the visible text.
    pub fn build(&self, lemmatizer: &Lemmatizer, content: &str, query: &str) -> Option<String> {
        let words = visible_words(content);
        let page_lemmas: Vec<String> = words.iter().map(|w| lemmatizer.token_lemma(w)).collect();
        let query_lemmas: Vec<String> = query
            .split_whitespace()
            .map(|w| lemmatizer.token_lemma(w))
            .filter(|l| !l.is_empty())
            .collect();

        let first = query_lemmas.first()?;
        let position = page_lemmas
            .iter()
            .position(|lemma| !lemma.is_empty() && lemma.contains(first.as_str()))?;

        let start = position.saturating_sub(self.words_around);
        let end = (position + self.words_around).min(words.len() - 1);

        let mut parts = Vec::with_capacity(end - start + 3);
        if start > 0 {
            parts.push(ELLIPSIS.to_string());
        }
        for i in start..=end {
            let lemma = &page_lemmas[i];
            let matched = i == position || (!lemma.is_empty() && query_lemmas.contains(lemma));
            if matched {
                parts.push(format!("{}{}{}", self.open, words[i], self.close));
            } else {
                parts.push(words[i].clone());
            }
        }
        if end < words.len() - 1 {
            parts.push(ELLIPSIS.to_string());
        }

        Some(parts.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stars(words_around: usize) -> SnippetBuilder {
        SnippetBuilder::new(words_around, ("**".into(), "**".into()))
    }

    #[test]
    fn window_fits_inside_text() {
        let l = Lemmatizer::russian();
        let snippet = stars(1).build(&l, "quick fox jumps", "fox").unwrap();
        assert_eq!(snippet, "quick **fox** jumps");
    }

    #[test]
    fn truncated_window_gets_ellipses() {
        let l = Lemmatizer::russian();
        let snippet = stars(1)
            .build(&l, "the quick brown fox jumps over", "fox")
            .unwrap();
        assert_eq!(snippet, "... brown **fox** jumps ...");
    }

    #[test]
    fn match_near_the_end_has_leading_ellipsis_only() {
        let l = Lemmatizer::russian();
        let snippet = stars(1)
            .build(&l, "the quick brown fox jumps", "fox")
            .unwrap();
        assert_eq!(snippet, "... brown **fox** jumps");
    }

    #[test]
    fn default_markers_are_bold_tags() {
        let l = Lemmatizer::russian();
        let builder = SnippetBuilder::new(3, ("<b>".into(), "</b>".into()));
        let snippet = builder
            .build(&l, "<html><body><p>Кошки любят молоко</p></body></html>", "кошка")
            .unwrap();
        assert_eq!(snippet, "<b>Кошки</b> любят молоко");
    }

    #[test]
    fn every_query_lemma_is_emphasised_and_case_is_kept() {
        let l = Lemmatizer::russian();
        let snippet = stars(5)
            .build(&l, "<p>The Fox met another fox, said FOX.</p>", "fox")
            .unwrap();
        assert_eq!(snippet, "The **Fox** met another **fox,** said **FOX.**");
    }

    #[test]
    fn head_and_scripts_are_not_visible() {
        let l = Lemmatizer::russian();
        let html = "<html><head><title>fox</title></head>\
                    <body><script>var fox = 1;</script><p>no animals here</p></body></html>";
        assert!(stars(2).build(&l, html, "fox").is_none());
    }

    #[test]
    fn missing_term_gives_none() {
        let l = Lemmatizer::russian();
        assert!(stars(2).build(&l, "quick fox", "dog").is_none());
        assert!(stars(2).build(&l, "quick fox", "").is_none());
        assert!(stars(2).build(&l, "", "fox").is_none());
    }

    #[test]
    fn first_query_lemma_anchors_the_window() {
        let l = Lemmatizer::russian();
        let snippet = stars(0)
            .build(&l, "dog one two three fox", "fox dog")
            .unwrap();
        assert_eq!(snippet, "... **fox**");
    }
}
