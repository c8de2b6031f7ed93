// src/search/mod.rs
// =============================================================================
// Query side of the index: ranking, pagination and result annotation.
//
// Submodules:
// - engine: SearchEngine, from query text to ranked pages
// - result: SearchResult / SearchOutcome and title extraction
// =============================================================================

mod engine;
mod result;

pub use engine::SearchEngine;
pub use result::{extract_title, SearchOutcome, SearchResult};
