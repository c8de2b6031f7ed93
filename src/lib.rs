// src/lib.rs
// =============================================================================
// site-searcher: crawls configured websites, builds a lemma-based inverted
// index of their pages and answers ranked free-text queries.
//
// Data flow:
//   IndexingService -> crawl units -> Lemmatizer -> Indexer -> Storage
//   SearchEngine <- Storage, using Lemmatizer and SnippetBuilder
//
// The binary (main.rs) is a thin CLI over these pieces.
// =============================================================================

pub mod config;
pub mod crawl;
pub mod error;
pub mod index;
pub mod lemma;
pub mod search;
pub mod statistics;
pub mod storage;

pub use config::AppConfig;
pub use crawl::{ControlResponse, IndexingService};
pub use error::{ConfigError, CrawlError, StoreError};
pub use index::Indexer;
pub use lemma::Lemmatizer;
pub use search::{SearchEngine, SearchOutcome, SearchResult};
pub use statistics::Statistics;
pub use storage::{MemoryStore, Storage};
