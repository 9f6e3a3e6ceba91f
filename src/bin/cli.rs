//! feedcrawl CLI
//!
//! Local execution entry point: crawl configured sites and write their feeds.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use feedcrawl::{
    config::{RunContext, load_config},
    error::Result,
    models::{AdapterConfig, SiteConfig},
    pipeline::{self, RunOptions},
    storage::{FeedStore, StoredCache},
};

/// feedcrawl - incremental RSS feeds for sites that have none
#[derive(Parser, Debug)]
#[command(
    name = "feedcrawl",
    version,
    about = "Crawl blog and news sites into per-source RSS feeds"
)]
struct Cli {
    /// Path to the feeds configuration file
    #[arg(short, long, default_value = "feeds.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl sites and regenerate their feeds
    Run {
        /// Sites to run (default: all configured sites)
        sites: Vec<String>,

        /// Crawl at full depth, merging into existing history
        #[arg(long)]
        full: bool,

        /// Discard cached history and rebuild from a full crawl
        #[arg(long)]
        reset: bool,
    },

    /// List configured sites
    List,

    /// Validate the configuration file
    Validate,

    /// Show cache and feed state
    Info {
        /// Site to inspect (default: all)
        site: Option<String>,
    },
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Directory relative output paths resolve against.
fn base_dir(config_path: &Path) -> PathBuf {
    config_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default()
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli.config)?;
    log::info!("Loaded {} site(s) from {}", config.sites.len(), cli.config.display());

    match cli.command {
        Command::Run { sites, full, reset } => {
            let ctx = RunContext::new(config.clone(), &base_dir(&cli.config))?;
            let selected = pipeline::select_sites(&config, &sites)?;
            let report = pipeline::run_all(&ctx, &selected, RunOptions { full, reset }).await?;

            for summary in &report.succeeded {
                log::info!(
                    "{}: +{} ({} total, {} page(s), {}) -> {}",
                    summary.site,
                    summary.added,
                    summary.total,
                    summary.pages_fetched,
                    summary.stop_reason,
                    summary.feed_path.display()
                );
            }
            for (site, error) in &report.failed {
                log::error!("{site}: {error}");
            }
            if !report.failed.is_empty() {
                log::warn!(
                    "{} of {} site(s) failed",
                    report.failed.len(),
                    selected.len()
                );
            }
        }

        Command::List => {
            for site in &config.sites {
                let kind = match site.adapter {
                    AdapterConfig::Html(_) => "html",
                    AdapterConfig::JsonApi(_) => "json_api",
                };
                log::info!("{:<20} {:<9} {}", site.name, kind, site.url);
            }
        }

        Command::Validate => {
            // load_config validates before returning
            log::info!("✓ Config OK ({} site(s))", config.sites.len());
        }

        Command::Info { site } => {
            let ctx = RunContext::new(config.clone(), &base_dir(&cli.config))?;
            let names: Vec<String> = site.into_iter().collect();
            for site in pipeline::select_sites(&config, &names)? {
                show_info(&ctx, site).await?;
            }
        }
    }

    Ok(())
}

async fn show_info(ctx: &RunContext, site: &SiteConfig) -> Result<()> {
    let store = ctx.store_for(site);
    let cache_path = store.cache_path();
    let feed_path = store.feed_path();

    log::info!("[{}] {}", site.name, site.title);
    match std::fs::read(&cache_path) {
        Ok(bytes) => {
            let cache: StoredCache = serde_json::from_slice(&bytes).unwrap_or_default();
            log::info!(
                "  cache: {} ({} article(s), updated {})",
                cache_path.display(),
                cache.articles.len(),
                cache.last_updated.as_deref().unwrap_or("unknown")
            );
        }
        Err(_) => log::info!("  cache: none"),
    }

    if feed_path.exists() {
        let articles = store.load().await?;
        log::info!(
            "  feed: {} (history {} article(s))",
            feed_path.display(),
            articles.len()
        );
    } else {
        log::info!("  feed: not written yet");
    }
    Ok(())
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
