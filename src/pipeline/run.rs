// src/pipeline/run.rs

//! Per-site pipeline and the sequential batch runner.
//!
//! load history → crawl → merge → order → save cache → write feed

use std::time::Duration;

use crate::config::RunContext;
use crate::error::{AppError, Result};
use crate::models::{Config, CrawlDepth, RunSummary, SiteConfig};
use crate::pipeline::crawl::CrawlController;
use crate::pipeline::merge::merge;
use crate::pipeline::order::order;
use crate::services::{SiteAdapter, build_adapter};
use crate::storage::FeedStore;

/// Caller choices for a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Crawl at full depth even when history exists
    pub full: bool,
    /// Discard history before crawling (implies `full`)
    pub reset: bool,
}

impl RunOptions {
    fn depth(&self, history_len: usize) -> CrawlDepth {
        if self.full || self.reset || history_len == 0 {
            CrawlDepth::Full
        } else {
            CrawlDepth::Incremental
        }
    }
}

/// Outcome of a batch run.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub succeeded: Vec<RunSummary>,
    /// Site names paired with the error that stopped them
    pub failed: Vec<(String, String)>,
}

/// Run the full pipeline for one site.
///
/// Nothing is written unless at least one page was fetched and the merged
/// history is non-empty, so an unreachable source leaves the previous cache
/// and feed untouched.
pub async fn run_site(
    ctx: &RunContext,
    site: &SiteConfig,
    adapter: &dyn SiteAdapter,
    store: &dyn FeedStore,
    options: RunOptions,
) -> Result<RunSummary> {
    let mut history = store.load().await?;
    if options.reset && !history.is_empty() {
        log::info!(
            "[{}] Reset requested, discarding {} cached article(s)",
            site.name,
            history.len()
        );
        history.clear();
    }

    let depth = options.depth(history.len());
    let normalizer = ctx.normalizer_for(site);
    let outcome = CrawlController::new(adapter, &normalizer, depth, &ctx.config.depth)
        .with_request_delay(Duration::from_millis(ctx.config.crawler.request_delay_ms))
        .crawl(&history)
        .await;

    if !outcome.reached_source() {
        return Err(AppError::fetch(
            &site.url,
            format!("no page could be fetched ({})", outcome.stop_reason),
        ));
    }

    let merged = merge(&outcome.articles, history);
    if merged.articles.is_empty() {
        return Err(AppError::validation(format!(
            "site '{}' produced no articles",
            site.name
        )));
    }

    if !merged.has_changes() {
        log::info!("[{}] No new articles, feed content unchanged", site.name);
    }

    let ordered = order(merged.articles.clone());
    let document = store.render(&ctx.feed_meta(site), &ordered)?;

    store.save(&merged.articles).await?;
    let feed_path = store.write(&document).await?;

    let summary = RunSummary {
        site: site.name.clone(),
        depth,
        stop_reason: outcome.stop_reason,
        pages_fetched: outcome.pages_fetched,
        added: merged.added,
        total: merged.articles.len(),
        feed_path,
    };
    log::info!(
        "[{}] Done: {} crawl, {} new, {} total, stopped on {}",
        summary.site,
        summary.depth,
        summary.added,
        summary.total,
        summary.stop_reason
    );
    Ok(summary)
}

/// Run every site in order with adapters built from configuration.
pub async fn run_all(
    ctx: &RunContext,
    sites: &[&SiteConfig],
    options: RunOptions,
) -> Result<BatchReport> {
    run_all_with(ctx, sites, options, |site| build_adapter(site, &ctx.client)).await
}

/// Run sites sequentially with a custom adapter factory.
///
/// Fails only when every site failed.
pub async fn run_all_with<F>(
    ctx: &RunContext,
    sites: &[&SiteConfig],
    options: RunOptions,
    make_adapter: F,
) -> Result<BatchReport>
where
    F: Fn(&SiteConfig) -> Result<Box<dyn SiteAdapter>>,
{
    let mut report = BatchReport::default();

    for &site in sites {
        let result = match make_adapter(site) {
            Ok(adapter) => {
                let store = ctx.store_for(site);
                run_site(ctx, site, adapter.as_ref(), &store, options).await
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(summary) => report.succeeded.push(summary),
            Err(e) => {
                log::error!("[{}] Failed: {}", site.name, e);
                report.failed.push((site.name.clone(), e.to_string()));
            }
        }
    }

    log::info!(
        "Batch finished: {} succeeded, {} failed",
        report.succeeded.len(),
        report.failed.len()
    );

    if !sites.is_empty() && report.succeeded.is_empty() {
        return Err(AppError::AllSourcesFailed {
            count: report.failed.len(),
        });
    }
    Ok(report)
}

/// Resolve site names; an empty list selects every configured site.
pub fn select_sites<'a>(config: &'a Config, names: &[String]) -> Result<Vec<&'a SiteConfig>> {
    if names.is_empty() {
        return Ok(config.sites.iter().collect());
    }
    names
        .iter()
        .map(|name| {
            config.site(name).ok_or_else(|| {
                AppError::config(format!(
                    "unknown site '{}' (known: {})",
                    name,
                    config
                        .sites
                        .iter()
                        .map(|s| s.name.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                ))
            })
        })
        .collect()
}
