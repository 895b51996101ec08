//! Kumo-Crawl main entry point
//!
//! Command-line front end that runs one orchestrated crawl job against
//! the local collaborator implementations and streams progress to the
//! terminal.

use anyhow::Context;
use clap::Parser;
use kumo_crawl::config::{load_config_with_hash, Config};
use kumo_crawl::crawler::HttpFetcher;
use kumo_crawl::orchestrator::{Collaborators, CrawlOrchestrationCoordinator, CrawlRequest};
use kumo_crawl::output::{LoggingStatusStore, MarkdownDirStore, NullCodeExtractor};
use kumo_crawl::progress::ProgressSubscriber;
use kumo_crawl::OrchestrationRegistry;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Kumo-Crawl: an asynchronous web-crawl orchestrator
///
/// Classifies the URL by shape (markdown file, sitemap, recursive,
/// single page), fetches it with the matching strategy, and stores the
/// results as markdown files while reporting progress.
#[derive(Parser, Debug)]
#[command(name = "kumo-crawl")]
#[command(about = "An asynchronous web-crawl orchestrator", long_about = None)]
struct Cli {
    /// URL to crawl
    #[arg(value_name = "URL")]
    url: String,

    /// Link-following depth (1 fetches only the URL itself)
    #[arg(long, default_value_t = 1)]
    max_depth: u32,

    /// Maximum concurrent fetches during batch crawls
    #[arg(long)]
    max_concurrency: Option<usize>,

    /// Also run the code-example extraction stage
    #[arg(long)]
    extract_code: bool,

    /// Directory the fetched markdown is written to
    #[arg(long, default_value = "./crawl-out")]
    out: PathBuf,

    /// Path to an optional TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.quiet);

    let config = match &cli.config {
        Some(path) => {
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?;
            tracing::info!("Configuration loaded (hash: {})", hash);
            config
        }
        None => Config::default(),
    };

    let fetcher = HttpFetcher::new(&config.user_agent).context("failed to build HTTP client")?;
    let collaborators = Collaborators {
        fetcher: Arc::new(fetcher),
        documents: Arc::new(MarkdownDirStore::new(&cli.out)),
        code_examples: Arc::new(NullCodeExtractor),
        source_status: Arc::new(LoggingStatusStore),
    };
    let registry = Arc::new(OrchestrationRegistry::new());

    let mut request = CrawlRequest::new(&cli.url);
    request.max_depth = cli.max_depth;
    request.max_concurrency = cli.max_concurrency;
    request.extract_code_examples = cli.extract_code;

    let subscriber: ProgressSubscriber = Arc::new(|_job_id, state| {
        println!("[{:>3}%] {}: {}", state.overall_percent, state.status, state.log);
    });

    let coordinator = Arc::new(
        CrawlOrchestrationCoordinator::new(
            request,
            collaborators,
            Arc::clone(&registry),
            config.orchestrator.clone(),
        )
        .with_subscriber(subscriber),
    );

    let job_id = coordinator.orchestrate().await;
    tracing::info!("Started crawl job {}", job_id);

    // Ctrl-C goes through the registry, the same path an external
    // cancellation API would use.
    let cancel_registry = Arc::clone(&registry);
    let cancel_job = job_id.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            if let Some(running) = cancel_registry.get(&cancel_job).await {
                running.cancel();
            }
        }
    });

    // Poll until the background task reaches a terminal state and has
    // unregistered itself.
    loop {
        tokio::time::sleep(Duration::from_millis(200)).await;
        if registry.get(&job_id).await.is_none() {
            break;
        }
    }

    let state = coordinator.progress_state();
    println!(
        "\nJob {} finished: {} at {}% ({})",
        job_id, state.status, state.overall_percent, state.log
    );

    if state.status == kumo_crawl::CrawlStatus::Failed {
        anyhow::bail!("crawl failed: {}", state.log);
    }
    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("kumo_crawl=info,warn"),
            1 => EnvFilter::new("kumo_crawl=debug,info"),
            2 => EnvFilter::new("kumo_crawl=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
