// src/lemma/mod.rs
// =============================================================================
// Text processing: lemmatization of pages and queries, and snippets.
//
// Submodules:
// - morphology: the dictionary that reduces Russian words to stems
// - text: normalisation, per-word lemmas and per-page lemma counts
// - snippet: the highlighted fragment shown with each search result
// =============================================================================

mod morphology;
mod snippet;
mod text;

pub use morphology::{MorphAnalysis, Morphology, RussianMorphology, WrongCharacter};
pub use snippet::SnippetBuilder;
pub use text::{remove_punctuation, Lemmatizer};
