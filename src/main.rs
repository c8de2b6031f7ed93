// src/main.rs
// =============================================================================
// Entry point of the site-searcher CLI.
//
// What happens here:
// 1. Set up logging (stderr, filtered by RUST_LOG, default "info")
// 2. Parse arguments, load the config and the index snapshot
// 3. Dispatch to the subcommand handler
// 4. Save the snapshot after commands that change the index
// 5. Exit with 0 = success, 1 = refused / nothing found, 2 = error
//
// Results go to stdout, logs to stderr, so `--json` output can be piped.
// =============================================================================

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use site_searcher::crawl::ControlResponse;
use site_searcher::{
    AppConfig, IndexingService, Lemmatizer, MemoryStore, SearchEngine, SearchOutcome,
    SearchResult, Statistics,
};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            2
        }
    };

    std::process::exit(exit_code);
}

async fn run() -> Result<i32> {
    let cli = Cli::parse();

    let config = AppConfig::load(&cli.config)
        .with_context(|| format!("loading config {}", cli.config.display()))?;
    let store = Arc::new(
        MemoryStore::load(&config.data_file)
            .with_context(|| format!("loading index {}", config.data_file.display()))?,
    );

    match cli.command {
        Commands::Index { json } => handle_index(config, store, json).await,
        Commands::IndexPage { url, json } => handle_index_page(config, store, &url, json).await,
        Commands::Search {
            query,
            offset,
            limit,
            site,
            json,
        } => handle_search(config, store, &query, offset, limit, site.as_deref(), json),
        Commands::Stats { json } => {
            let stats = Statistics::collect(store.as_ref(), false)?;
            print_stats(&stats, json)?;
            Ok(0)
        }
    }
}

// Runs a full crawl; Ctrl-C stops it and keeps what was indexed so far
async fn handle_index(config: AppConfig, store: Arc<MemoryStore>, json: bool) -> Result<i32> {
    let data_file = config.data_file.clone();
    let service = IndexingService::new(config, store.clone())?;

    let response = service.start_indexing();
    if !response.result {
        print_control(&response, json)?;
        return Ok(1);
    }

    let stopper = service.clone();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("received Ctrl+C, stopping indexing...");
            match stopper.stop_indexing() {
                Ok(response) if !response.result => {
                    tracing::info!(error = ?response.error, "nothing to stop")
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = %e, "stop failed"),
            }
        }
    });

    service.wait().await;
    ctrl_c.abort();

    store
        .save(&data_file)
        .with_context(|| format!("saving index {}", data_file.display()))?;

    let stats = Statistics::collect(store.as_ref(), service.is_indexing())?;
    print_stats(&stats, json)?;
    Ok(0)
}

async fn handle_index_page(
    config: AppConfig,
    store: Arc<MemoryStore>,
    url: &str,
    json: bool,
) -> Result<i32> {
    let data_file = config.data_file.clone();
    let service = IndexingService::new(config, store.clone())?;

    let response = service.index_single_page(url).await?;
    if response.result {
        store
            .save(&data_file)
            .with_context(|| format!("saving index {}", data_file.display()))?;
    }
    print_control(&response, json)?;
    Ok(if response.result { 0 } else { 1 })
}

fn handle_search(
    config: AppConfig,
    store: Arc<MemoryStore>,
    query: &str,
    offset: usize,
    limit: Option<usize>,
    site: Option<&str>,
    json: bool,
) -> Result<i32> {
    let engine = SearchEngine::new(store, Arc::new(Lemmatizer::russian()), config.search);
    let outcome = engine.search(query, offset, limit, site)?;

    if json {
        let value = match &outcome {
            SearchOutcome::Found { total, results } => serde_json::json!({
                "result": true,
                "count": total,
                "data": results,
            }),
            SearchOutcome::NoResults => serde_json::json!({
                "result": false,
                "error": "Nothing found",
            }),
        };
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        match &outcome {
            SearchOutcome::Found { total, results } => print_results(*total, offset, results),
            SearchOutcome::NoResults => println!("Nothing found for \"{query}\""),
        }
    }

    Ok(match outcome {
        SearchOutcome::Found { .. } => 0,
        SearchOutcome::NoResults => 1,
    })
}

fn print_control(response: &ControlResponse, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(response)?);
    } else if response.result {
        println!("OK");
    } else {
        println!("Refused: {}", response.error.as_deref().unwrap_or("unknown reason"));
    }
    Ok(())
}

// Prints ranked results, one block per page
fn print_results(total: usize, offset: usize, results: &[SearchResult]) {
    println!("Found {total} page(s)\n");

    for (i, result) in results.iter().enumerate() {
        let title = if result.title.is_empty() {
            "(untitled)"
        } else {
            result.title.as_str()
        };
        println!(
            "{:>3}. [{:.3}] {}{}  {}",
            offset + i + 1,
            result.relevance,
            result.site,
            result.uri,
            title
        );
        println!("     {}", result.site_name);
        if let Some(snippet) = &result.snippet {
            println!("     {snippet}");
        }
        println!();
    }
}

fn print_stats(stats: &Statistics, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(stats)?);
        return Ok(());
    }

    println!("{:<40} {:<10} {:>8} {:>8}  {}", "SITE", "STATUS", "PAGES", "LEMMAS", "ERROR");
    println!("{}", "=".repeat(90));
    for site in &stats.detailed {
        // Truncate URL if too long for display
        let url = if site.url.chars().count() > 37 {
            format!("{}...", site.url.chars().take(37).collect::<String>())
        } else {
            site.url.clone()
        };
        println!(
            "{:<40} {:<10} {:>8} {:>8}  {}",
            url,
            site.status.to_string(),
            site.pages,
            site.lemmas,
            site.error.as_deref().unwrap_or("")
        );
    }

    println!();
    println!("Summary:");
    println!("   Sites:  {}", stats.total.sites);
    println!("   Pages:  {}", stats.total.pages);
    println!("   Lemmas: {}", stats.total.lemmas);
    Ok(())
}
