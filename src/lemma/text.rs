// src/lemma/text.rs
// =============================================================================
// Turns page HTML and query text into lemmas.
//
// Pipeline for a page:
//   raw HTML -> normalize() -> whitespace tokens -> lemma() -> counts
//
// Word characters are Cyrillic letters, Latin letters and digits. Everything
// else is treated as a separator.
// =============================================================================

use super::morphology::{is_cyrillic_lower, Morphology, RussianMorphology};
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

fn script_block() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<script.*?</script>").expect("constant pattern"))
}

fn any_tag() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]*>").expect("constant pattern"))
}

/// Cyrillic letter (either case), Latin letter or ASCII digit.
pub fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || is_cyrillic_lower(c) || matches!(c, 'А'..='Я' | 'Ё')
}

/// Replaces runs of separators with one space and trims the ends.
fn collapse_separators(text: &str) -> String {
    text.split(|c: char| !is_word_char(c))
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Lemmatizer over a morphological dictionary.
pub struct Lemmatizer {
    morphology: Box<dyn Morphology>,
}

impl Lemmatizer {
    pub fn new(morphology: impl Morphology + 'static) -> Self {
        Self {
            morphology: Box::new(morphology),
        }
    }

    /// Lemmatizer backed by the built-in Russian dictionary.
    pub fn russian() -> Self {
        Self::new(RussianMorphology::new())
    }

    /// Lowercases, drops `<script>` blocks and tags, and keeps only word
    /// characters separated by single spaces.
    pub fn normalize(&self, html: &str) -> String {
        let lower = html.to_lowercase();
        let without_scripts = script_block().replace_all(&lower, " ");
        let without_tags = any_tag().replace_all(&without_scripts, " ");
        collapse_separators(&without_tags)
    }

    /// Canonical stem of one token; the empty string when the token carries
    /// no searchable meaning.
    pub fn lemma(&self, word: &str) -> String {
        let word = word.to_lowercase();
        if word.is_empty() {
            return String::new();
        }

        if word.chars().all(is_cyrillic_lower) {
            return match self.morphology.analyses(&word) {
                Ok(analyses) => match analyses.first() {
                    Some(first) if !first.is_function_word() => first.normal_form.clone(),
                    _ => String::new(),
                },
                Err(rejected) => {
                    tracing::trace!(%rejected, "dictionary rejected token");
                    String::new()
                }
            };
        }

        // digits, Latin words and Latin/digit mixes are kept verbatim
        if word.chars().all(|c| c.is_ascii_alphanumeric()) {
            return word;
        }

        // mixed alphabets: not something the dictionary can analyse
        String::new()
    }

    /// Occurrences of each lemma in the page, the empty lemma included.
    pub fn count_lemmas(&self, html: &str) -> HashMap<String, usize> {
        let mut counts = HashMap::new();
        for token in self.normalize(html).split_whitespace() {
            *counts.entry(self.lemma(token)).or_insert(0) += 1;
        }
        counts
    }

    /// Lemma of a raw, possibly punctuated, word as seen in running text.
    /// Tokens without any word character are returned unchanged so that the
    /// result stays aligned with the original words.
    pub fn token_lemma(&self, token: &str) -> String {
        let lower = token.to_lowercase();
        if !lower.chars().any(is_word_char) {
            return lower;
        }
        let cleaned: String = lower.chars().filter(|c| is_word_char(*c)).collect();
        self.lemma(&cleaned)
    }
}

/// Replaces everything that is not a word character with spaces.
pub fn remove_punctuation(text: &str) -> String {
    text.chars()
        .map(|c| if is_word_char(c) { c } else { ' ' })
        .collect::<String>()
        .trim()
        .to_string()
}
