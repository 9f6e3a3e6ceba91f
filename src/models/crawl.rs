// src/models/crawl.rs

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::models::Article;

/// How deep a crawl paginates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlDepth {
    /// Cold start or explicit reset: walk many pages
    Full,
    /// Ordinary run: recent pages only, history covers the rest
    Incremental,
}

impl fmt::Display for CrawlDepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => f.write_str("full"),
            Self::Incremental => f.write_str("incremental"),
        }
    }
}

/// Why pagination ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// A page yielded no article that was not already seen
    NoNewItems,
    /// A page yielded no items at all
    EmptyPage,
    /// The page does not exist
    NotFound,
    /// The page-limit safety cap was reached
    PageLimit,
    /// A page could not be fetched or parsed
    FetchError,
    /// The source reported no further pages
    LastPage,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NoNewItems => "no_new_items",
            Self::EmptyPage => "empty_page",
            Self::NotFound => "not_found",
            Self::PageLimit => "page_limit",
            Self::FetchError => "fetch_error",
            Self::LastPage => "last_page",
        };
        f.write_str(s)
    }
}

/// Pagination state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlState {
    Fetching(u32),
    Stopped(StopReason),
}

/// Result of driving one adapter through its pages.
#[derive(Debug, Clone)]
pub struct CrawlOutcome {
    /// Articles not seen before, in discovery order
    pub articles: Vec<Article>,
    /// Pages fetched successfully
    pub pages_fetched: u32,
    /// Raw items extracted across all pages
    pub items_extracted: usize,
    /// Raw items rejected by normalization
    pub items_rejected: usize,
    pub stop_reason: StopReason,
}

impl CrawlOutcome {
    /// Whether at least one page came back.
    pub fn reached_source(&self) -> bool {
        self.pages_fetched > 0
    }
}

/// Summary of one site's pipeline run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub site: String,
    pub depth: CrawlDepth,
    pub stop_reason: StopReason,
    pub pages_fetched: u32,
    /// Articles appended to history
    pub added: usize,
    /// History size after the merge
    pub total: usize,
    pub feed_path: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_reason_names() {
        assert_eq!(StopReason::NoNewItems.to_string(), "no_new_items");
        assert_eq!(StopReason::PageLimit.to_string(), "page_limit");
        assert_eq!(
            serde_json::to_string(&StopReason::FetchError).unwrap(),
            "\"fetch_error\""
        );
    }
}
