// src/lemma/morphology.rs
// =============================================================================
// Morphological dictionary used to turn Cyrillic words into lemmas.
//
// `Morphology` is the seam: give it a lowercase word, get back its analyses
// (normal form + grammatical tags) or a `WrongCharacter` rejection when the
// word is not made of letters the dictionary understands.
//
// `RussianMorphology` is the built-in dictionary:
// - function words (conjunctions, prepositions, interjections) come from a
//   fixed table and are tagged СОЮЗ / ПРЕДЛ / МЕЖД
// - every other word is reduced with the Snowball Russian stemmer
// =============================================================================

use rust_stemmers::{Algorithm, Stemmer};
use std::collections::HashMap;

/// Tag for conjunctions.
pub const CONJUNCTION: &str = "СОЮЗ";
/// Tag for prepositions.
pub const PREPOSITION: &str = "ПРЕДЛ";
/// Tag for interjections and standalone particles.
pub const INTERJECTION: &str = "МЕЖД";

const FUNCTION_TAGS: [&str; 3] = [INTERJECTION, PREPOSITION, CONJUNCTION];

const CONJUNCTIONS: &[&str] = &[
    "и", "а", "но", "или", "либо", "да", "зато", "однако", "что", "чтобы", "если", "хотя",
    "будто", "словно", "ибо", "тоже", "также", "притом", "причем", "ни", "иль",
];

const PREPOSITIONS: &[&str] = &[
    "в", "во", "на", "с", "со", "к", "ко", "по", "о", "об", "обо", "от", "ото", "до", "из",
    "изо", "за", "под", "подо", "над", "при", "про", "для", "без", "безо", "у", "через",
    "между", "перед", "передо", "около", "вокруг", "среди", "сквозь", "ради", "вдоль",
];

const INTERJECTIONS: &[&str] = &[
    "ах", "ох", "эх", "ой", "ай", "ух", "увы", "ого", "ура", "эй", "ну", "ага", "ба", "тьфу",
];

/// One grammatical reading of a word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MorphAnalysis {
    pub normal_form: String,
    pub tags: Vec<&'static str>,
}

impl MorphAnalysis {
    /// True for conjunctions, prepositions and interjections.
    pub fn is_function_word(&self) -> bool {
        self.tags.iter().any(|tag| FUNCTION_TAGS.contains(tag))
    }
}

/// The dictionary refused the word because of its characters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("wrong character in '{0}'")]
pub struct WrongCharacter(pub String);

pub trait Morphology: Send + Sync {
    /// All readings of `word`, most likely first. Never returns an empty list.
    fn analyses(&self, word: &str) -> Result<Vec<MorphAnalysis>, WrongCharacter>;
}

/// Lowercase Russian letters, including `ё`.
pub fn is_cyrillic_lower(c: char) -> bool {
    matches!(c, 'а'..='я' | 'ё')
}

pub struct RussianMorphology {
    stemmer: Stemmer,
    function_words: HashMap<&'static str, &'static str>,
}

impl RussianMorphology {
    pub fn new() -> Self {
        let mut function_words = HashMap::new();
        for (words, tag) in [
            (CONJUNCTIONS, CONJUNCTION),
            (PREPOSITIONS, PREPOSITION),
            (INTERJECTIONS, INTERJECTION),
        ] {
            for word in words {
                function_words.insert(*word, tag);
            }
        }
        Self {
            stemmer: Stemmer::create(Algorithm::Russian),
            function_words,
        }
    }
}

impl Default for RussianMorphology {
    fn default() -> Self {
        Self::new()
    }
}

impl Morphology for RussianMorphology {
    fn analyses(&self, word: &str) -> Result<Vec<MorphAnalysis>, WrongCharacter> {
        if word.is_empty() || !word.chars().all(is_cyrillic_lower) {
            return Err(WrongCharacter(word.to_string()));
        }

        if let Some(tag) = self.function_words.get(word) {
            return Ok(vec![MorphAnalysis {
                normal_form: word.to_string(),
                tags: vec![*tag],
            }]);
        }

        Ok(vec![MorphAnalysis {
            normal_form: self.stemmer.stem(word).into_owned(),
            tags: Vec::new(),
        }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_forms_share_a_normal_form() {
        let morph = RussianMorphology::new();
        let a = morph.analyses("кошка").unwrap();
        let b = morph.analyses("кошки").unwrap();
        assert_eq!(a[0].normal_form, b[0].normal_form);
        assert!(!a[0].is_function_word());
    }

    #[test]
    fn function_words_are_tagged() {
        let morph = RussianMorphology::new();
        assert_eq!(morph.analyses("и").unwrap()[0].tags, vec![CONJUNCTION]);
        assert_eq!(morph.analyses("через").unwrap()[0].tags, vec![PREPOSITION]);
        assert_eq!(morph.analyses("увы").unwrap()[0].tags, vec![INTERJECTION]);
        assert!(morph.analyses("в").unwrap()[0].is_function_word());
    }

    #[test]
    fn non_cyrillic_is_rejected() {
        let morph = RussianMorphology::new();
        assert_eq!(
            morph.analyses("cat").unwrap_err(),
            WrongCharacter("cat".into())
        );
        assert!(morph.analyses("кот1").is_err());
        assert!(morph.analyses("").is_err());
        // uppercase is the caller's job
        assert!(morph.analyses("Кот").is_err());
    }

    #[test]
    fn yo_is_a_cyrillic_letter() {
        assert!(is_cyrillic_lower('ё'));
        assert!(!is_cyrillic_lower('Ё'));
        assert!(RussianMorphology::new().analyses("ёлка").is_ok());
    }
}
