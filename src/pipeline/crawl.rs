// src/pipeline/crawl.rs

//! Pagination controller.
//!
//! Drives a [`SiteAdapter`] page by page and decides when to stop. The
//! controller never branches on which site it is crawling; everything
//! site-specific lives behind the adapter.

use std::collections::HashSet;
use std::time::Duration;

use crate::models::{Article, CrawlDepth, CrawlOutcome, CrawlState, DepthConfig, StopReason};
use crate::pipeline::normalize::ArticleNormalizer;
use crate::services::SiteAdapter;

/// Running totals for one crawl.
#[derive(Debug, Default)]
struct Progress {
    articles: Vec<Article>,
    pages_fetched: u32,
    items_extracted: usize,
    items_rejected: usize,
}

/// Crawls one source at a fixed depth.
pub struct CrawlController<'a> {
    adapter: &'a dyn SiteAdapter,
    normalizer: &'a ArticleNormalizer,
    depth: CrawlDepth,
    page_limit: u32,
    request_delay: Duration,
}

impl<'a> CrawlController<'a> {
    pub fn new(
        adapter: &'a dyn SiteAdapter,
        normalizer: &'a ArticleNormalizer,
        depth: CrawlDepth,
        limits: &DepthConfig,
    ) -> Self {
        let page_limit = match depth {
            CrawlDepth::Full => limits.full_page_limit,
            CrawlDepth::Incremental => limits.incremental_page_limit,
        };
        Self {
            adapter,
            normalizer,
            depth,
            page_limit: page_limit.max(1),
            request_delay: Duration::ZERO,
        }
    }

    /// Pause between consecutive page fetches.
    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    pub fn page_limit(&self) -> u32 {
        self.page_limit
    }

    /// Walk pages until a stop condition, collecting unseen articles.
    ///
    /// Never fails: fetch and parse errors end pagination and keep whatever
    /// was collected on earlier pages.
    pub async fn crawl(&self, history: &[Article]) -> CrawlOutcome {
        let mut seen: HashSet<String> = match self.depth {
            CrawlDepth::Incremental => history.iter().map(|a| a.link.clone()).collect(),
            CrawlDepth::Full => HashSet::new(),
        };
        let mut progress = Progress::default();

        log::info!(
            "[{}] Starting {} crawl (up to {} page(s), {} known)",
            self.adapter.name(),
            self.depth,
            self.page_limit,
            history.len()
        );

        let mut state = CrawlState::Fetching(1);
        let stop_reason = loop {
            match state {
                CrawlState::Fetching(page) => {
                    state = self.step(page, &mut seen, &mut progress).await;
                }
                CrawlState::Stopped(reason) => break reason,
            }
        };

        log::info!(
            "[{}] Crawl stopped: {} after {} page(s), {} new, {} rejected",
            self.adapter.name(),
            stop_reason,
            progress.pages_fetched,
            progress.articles.len(),
            progress.items_rejected
        );

        CrawlOutcome {
            articles: progress.articles,
            pages_fetched: progress.pages_fetched,
            items_extracted: progress.items_extracted,
            items_rejected: progress.items_rejected,
            stop_reason,
        }
    }

    /// Fetch and process one page, returning the next state.
    async fn step(
        &self,
        page: u32,
        seen: &mut HashSet<String>,
        progress: &mut Progress,
    ) -> CrawlState {
        let name = self.adapter.name();
        if page > 1 && !self.request_delay.is_zero() {
            tokio::time::sleep(self.request_delay).await;
        }

        let raw = match self.adapter.fetch_page(page).await {
            Ok(raw) => raw,
            Err(e) if e.is_not_found() => {
                log::info!("[{name}] Page {page} not found");
                return CrawlState::Stopped(StopReason::NotFound);
            }
            Err(e) => {
                log::warn!("[{name}] Failed to fetch page {page}: {e}");
                return CrawlState::Stopped(StopReason::FetchError);
            }
        };

        if self.adapter.is_not_found(&raw) {
            log::info!("[{name}] Page {page} is a not-found page");
            return CrawlState::Stopped(StopReason::NotFound);
        }

        let items = match self.adapter.extract_items(&raw) {
            Ok(items) => items,
            Err(e) => {
                log::warn!("[{name}] Failed to parse page {page}: {e}");
                return CrawlState::Stopped(StopReason::FetchError);
            }
        };
        progress.pages_fetched += 1;

        if items.is_empty() {
            log::info!("[{name}] Page {page} has no items");
            return CrawlState::Stopped(StopReason::EmptyPage);
        }
        progress.items_extracted += items.len();

        let (accepted, rejected) = self.normalizer.normalize_all(&items);
        progress.items_rejected += rejected;

        let before = progress.articles.len();
        for article in accepted {
            if seen.insert(article.link.clone()) {
                progress.articles.push(article);
            } else {
                log::debug!("[{name}] Already seen {}", article.link);
            }
        }
        let new_items = progress.articles.len() - before;

        log::info!(
            "[{name}] Page {page}: {} item(s), {new_items} new",
            items.len()
        );

        if new_items == 0 {
            CrawlState::Stopped(StopReason::NoNewItems)
        } else if !self.adapter.has_more(&raw, &items) {
            CrawlState::Stopped(StopReason::LastPage)
        } else if page >= self.page_limit {
            CrawlState::Stopped(StopReason::PageLimit)
        } else {
            CrawlState::Fetching(page + 1)
        }
    }
}
