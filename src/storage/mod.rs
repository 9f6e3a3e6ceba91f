//! Persistence for one source's history and its rendered feed.
//!
//! ## Directory Structure
//!
//! ```text
//! {cache_dir}/
//! └── {name}_posts.json     # History: every article ever seen
//! {feeds_dir}/
//! └── feed_{name}.xml       # Published RSS 2.0 feed
//! ```

pub mod local;
pub mod rss;

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{Article, FeedMeta, StoredArticle};

pub use local::LocalFeedStore;

/// A rendered feed, ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedDocument {
    /// Number of items in the feed
    pub item_count: usize,
    pub xml: String,
}

/// Cache file written by [`FeedStore::save`].
#[derive(Debug, Clone, Serialize)]
pub struct CacheFile<'a> {
    /// When the cache was last written
    pub last_updated: DateTime<Utc>,
    pub articles: &'a [Article],
}

impl<'a> CacheFile<'a> {
    pub fn new(articles: &'a [Article]) -> Self {
        Self {
            last_updated: Utc::now(),
            articles,
        }
    }
}

/// Lenient read side of the cache file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoredCache {
    #[serde(default)]
    pub last_updated: Option<String>,
    #[serde(default)]
    pub articles: Vec<StoredArticle>,
}

/// History and feed persistence for a single source.
#[async_trait]
pub trait FeedStore: Send + Sync {
    /// Load the history set; empty when there is no prior state.
    async fn load(&self) -> Result<Vec<Article>>;

    /// Persist the history set, replacing the previous one.
    async fn save(&self, articles: &[Article]) -> Result<()>;

    /// Render articles, already in feed order, into an RSS document.
    fn render(&self, meta: &FeedMeta, articles: &[Article]) -> Result<FeedDocument>;

    /// Write a rendered feed and return where it went.
    async fn write(&self, document: &FeedDocument) -> Result<PathBuf>;
}
