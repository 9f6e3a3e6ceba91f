//! Local filesystem storage implementation.
//!
//! ## Storage Layout
//!
//! ```text
//! {cache_dir}/{name}_posts.json   # History (JSON)
//! {feeds_dir}/feed_{name}.xml     # Feed (RSS 2.0)
//! ```
//!
//! Every write goes to a temporary file that is renamed into place, so a
//! failed run never leaves a half-written cache or feed behind.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::{Article, FeedMeta};
use crate::pipeline::normalize::ArticleNormalizer;
use crate::storage::{CacheFile, FeedDocument, FeedStore, StoredCache, rss};

/// Filesystem store for one source.
#[derive(Debug, Clone)]
pub struct LocalFeedStore {
    name: String,
    cache_dir: PathBuf,
    feeds_dir: PathBuf,
    normalizer: ArticleNormalizer,
}

impl LocalFeedStore {
    /// Create a store for `name`; `normalizer` repairs cached entries on load.
    pub fn new(
        name: impl Into<String>,
        cache_dir: impl Into<PathBuf>,
        feeds_dir: impl Into<PathBuf>,
        normalizer: ArticleNormalizer,
    ) -> Self {
        Self {
            name: name.into(),
            cache_dir: cache_dir.into(),
            feeds_dir: feeds_dir.into(),
            normalizer,
        }
    }

    pub fn cache_path(&self) -> PathBuf {
        self.cache_dir.join(format!("{}_posts.json", self.name))
    }

    pub fn feed_path(&self) -> PathBuf {
        self.feeds_dir.join(format!("feed_{}.xml", self.name))
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
        Self::ensure_dir(path).await?;

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(path: &Path) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Rebuild history from the previously written feed, if any.
    async fn recover_from_feed(&self) -> Result<Vec<Article>> {
        let path = self.feed_path();
        let Some(bytes) = Self::read_bytes(&path).await? else {
            return Ok(Vec::new());
        };

        let items = match rss::parse_feed(&String::from_utf8_lossy(&bytes)) {
            Ok(items) => items,
            Err(e) => {
                log::warn!("[{}] Existing feed {:?} is unreadable: {}", self.name, path, e);
                return Ok(Vec::new());
            }
        };

        let articles: Vec<Article> = items
            .into_iter()
            .filter_map(|item| self.normalizer.restore(item))
            .collect();
        log::info!(
            "[{}] Recovered {} article(s) from {:?}",
            self.name,
            articles.len(),
            path
        );
        Ok(articles)
    }
}

#[async_trait]
impl FeedStore for LocalFeedStore {
    async fn load(&self) -> Result<Vec<Article>> {
        let path = self.cache_path();
        let Some(bytes) = Self::read_bytes(&path).await? else {
            log::info!("[{}] No cache at {:?}", self.name, path);
            return self.recover_from_feed().await;
        };

        let cache: StoredCache = match serde_json::from_slice(&bytes) {
            Ok(cache) => cache,
            Err(e) => {
                log::warn!(
                    "[{}] Cache {:?} is corrupt ({}), falling back to the existing feed",
                    self.name,
                    path,
                    e
                );
                return self.recover_from_feed().await;
            }
        };

        let stored = cache.articles.len();
        let articles: Vec<Article> = cache
            .articles
            .into_iter()
            .filter_map(|item| self.normalizer.restore(item))
            .collect();
        if articles.len() < stored {
            log::warn!(
                "[{}] Dropped {} cached entr(ies) without a valid link",
                self.name,
                stored - articles.len()
            );
        }
        log::info!("[{}] Loaded {} cached article(s)", self.name, articles.len());
        Ok(articles)
    }

    async fn save(&self, articles: &[Article]) -> Result<()> {
        let path = self.cache_path();
        let bytes = serde_json::to_vec_pretty(&CacheFile::new(articles))?;
        Self::write_bytes(&path, &bytes).await?;
        log::info!("[{}] Saved {} article(s) to {:?}", self.name, articles.len(), path);
        Ok(())
    }

    fn render(&self, meta: &FeedMeta, articles: &[Article]) -> Result<FeedDocument> {
        Ok(FeedDocument {
            item_count: articles.len(),
            xml: rss::render_feed(meta, articles)?,
        })
    }

    async fn write(&self, document: &FeedDocument) -> Result<PathBuf> {
        let path = self.feed_path();
        Self::write_bytes(&path, document.xml.as_bytes()).await?;
        log::info!(
            "[{}] Wrote feed with {} item(s) to {:?}",
            self.name,
            document.item_count,
            path
        );
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NormalizeConfig;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn store(tmp: &TempDir) -> LocalFeedStore {
        LocalFeedStore::new(
            "example",
            tmp.path().join("cache"),
            tmp.path().join("feeds"),
            ArticleNormalizer::new(&NormalizeConfig::default()),
        )
    }

    fn article(slug: &str, day: u32) -> Article {
        Article {
            title: format!("Post about {slug}"),
            link: format!("https://example.com/{slug}"),
            date: Utc.with_ymd_and_hms(2025, 5, day, 9, 15, 30).unwrap(),
            category: "News".to_string(),
            description: format!("Summary for {slug}"),
        }
    }

    fn meta() -> FeedMeta {
        FeedMeta {
            name: "example".to_string(),
            title: "Example".to_string(),
            description: "Example feed".to_string(),
            language: "en".to_string(),
            site_url: "https://example.com".to_string(),
            self_url: "https://feeds.example.org/feed_example.xml".to_string(),
        }
    }

    #[tokio::test]
    async fn test_load_without_state_is_empty() {
        let tmp = TempDir::new().unwrap();
        assert!(store(&tmp).load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_load_round_trip() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        let articles = vec![article("a", 1), article("b", 2), article("c", 3)];

        store.save(&articles).await.unwrap();
        assert_eq!(store.load().await.unwrap(), articles);
        assert!(store.cache_path().ends_with("cache/example_posts.json"));
    }

    #[tokio::test]
    async fn test_cache_file_shape() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        store.save(&[article("a", 1)]).await.unwrap();

        let raw = std::fs::read_to_string(store.cache_path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert!(value["last_updated"].is_string());
        assert_eq!(value["articles"][0]["link"], "https://example.com/a");
        assert_eq!(value["articles"][0]["date"], "2025-05-01T09:15:30Z");
    }

    #[tokio::test]
    async fn test_corrupt_cache_is_empty_history() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        std::fs::create_dir_all(tmp.path().join("cache")).unwrap();
        std::fs::write(store.cache_path(), b"{ not json").unwrap();

        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_cache_recovers_from_feed() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        let articles = vec![article("c", 3), article("b", 2), article("a", 1)];

        store.save(&articles).await.unwrap();
        let doc = store.render(&meta(), &articles).unwrap();
        store.write(&doc).await.unwrap();
        std::fs::write(store.cache_path(), b"{ not json").unwrap();

        assert_eq!(store.load().await.unwrap(), articles);
    }

    #[tokio::test]
    async fn test_bad_cached_dates_are_repaired() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        std::fs::create_dir_all(tmp.path().join("cache")).unwrap();
        std::fs::write(
            store.cache_path(),
            r#"{"articles": [
                {"title": "Old entry", "link": "https://example.com/old", "date": "sometime"},
                {"title": "No link"}
            ]}"#,
        )
        .unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.len(), 1);
        let fallback = ArticleNormalizer::new(&NormalizeConfig::default())
            .fallback()
            .date_for("https://example.com/old");
        assert_eq!(loaded[0].date, fallback);
        assert_eq!(loaded[0].description, "Old entry");
    }

    #[tokio::test]
    async fn test_missing_cache_recovers_from_feed() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        let articles = vec![article("b", 2), article("a", 1)];

        let doc = store.render(&meta(), &articles).unwrap();
        store.write(&doc).await.unwrap();

        let recovered = store.load().await.unwrap();
        assert_eq!(recovered, articles);
    }

    #[tokio::test]
    async fn test_write_creates_directories_idempotently() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        let doc = store.render(&meta(), &[article("a", 1)]).unwrap();

        let first = store.write(&doc).await.unwrap();
        let second = store.write(&doc).await.unwrap();
        assert_eq!(first, second);
        assert!(first.ends_with("feeds/feed_example.xml"));
        assert_eq!(std::fs::read_to_string(&first).unwrap(), doc.xml);
        assert!(!first.with_extension("tmp").exists());
    }
}
