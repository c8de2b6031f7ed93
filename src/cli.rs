// src/cli.rs
// =============================================================================
// Command-line interface, defined with clap's derive API.
//
// Subcommands:
// - index:      crawl every configured site (Ctrl-C stops the run)
// - index-page: re-index a single URL of a configured site
// - search:     query the index
// - stats:      show what is indexed
// =============================================================================

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "site-searcher",
    version,
    about = "Crawl websites into a lemma index and search them",
    long_about = "site-searcher crawls the sites listed in its TOML config, indexes every page by \
                  word lemmas and answers ranked free-text queries with highlighted snippets."
)]
pub struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, short, global = true, default_value = "site-searcher.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Crawl and index every configured site, replacing their previous index
    ///
    /// Example: site-searcher index
    Index {
        /// Print the final statistics as JSON
        #[arg(long)]
        json: bool,
    },

    /// Fetch and index one page of a configured site
    ///
    /// Example: site-searcher index-page https://example.com/docs/intro
    IndexPage {
        /// Absolute URL of the page
        url: String,

        #[arg(long)]
        json: bool,
    },

    /// Search the index
    ///
    /// Example: site-searcher search "кошки и собаки" --site example.com
    Search {
        /// Free-text query
        query: String,

        /// Position of the first result to show
        #[arg(long, default_value_t = 0)]
        offset: usize,

        /// Result limit (defaults to search.default_limit from the config)
        #[arg(long)]
        limit: Option<usize>,

        /// Only search sites whose URL contains this text
        #[arg(long)]
        site: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// Show indexing statistics
    Stats {
        #[arg(long)]
        json: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_flags_parse() {
        let cli = Cli::parse_from([
            "site-searcher",
            "search",
            "кошки",
            "--offset",
            "10",
            "--site",
            "example.com",
            "--config",
            "custom.toml",
        ]);
        assert_eq!(cli.config, PathBuf::from("custom.toml"));
        match cli.command {
            Commands::Search {
                query,
                offset,
                limit,
                site,
                json,
            } => {
                assert_eq!(query, "кошки");
                assert_eq!(offset, 10);
                assert_eq!(limit, None);
                assert_eq!(site.as_deref(), Some("example.com"));
                assert!(!json);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn config_defaults_and_kebab_case_subcommand() {
        let cli = Cli::parse_from(["site-searcher", "index-page", "https://example.com/a"]);
        assert_eq!(cli.config, PathBuf::from("site-searcher.toml"));
        assert!(matches!(cli.command, Commands::IndexPage { ref url, json: false } if url == "https://example.com/a"));
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
