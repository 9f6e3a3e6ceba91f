// src/config.rs

//! Configuration loading and the per-run context.
//!
//! A [`RunContext`] is built once per invocation and handed to every
//! component, so nothing reads global state.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use reqwest::Client;

use crate::error::{AppError, Result};
use crate::models::{Config, FeedMeta, SiteConfig};
use crate::pipeline::normalize::ArticleNormalizer;
use crate::storage::LocalFeedStore;
use crate::utils::http::create_async_client;

/// Load configuration from a TOML file and validate it.
///
/// A missing file falls back to the built-in defaults. A file that does not
/// parse, or a configuration that fails validation, is an error.
pub fn load_config(path: &Path) -> Result<Config> {
    let config = Config::load_or_default(path)?;
    config
        .validate()
        .map_err(|e| AppError::config(format!("Invalid configuration in {path:?}: {e}")))?;
    Ok(config)
}

/// Shared state for one run.
#[derive(Clone)]
pub struct RunContext {
    pub config: Arc<Config>,
    pub client: Client,
    /// Directory holding `{name}_posts.json` history files
    pub cache_dir: PathBuf,
    /// Directory holding `feed_{name}.xml` feeds
    pub feeds_dir: PathBuf,
}

impl RunContext {
    /// Build a context; relative output paths resolve against `base_dir`.
    pub fn new(config: Config, base_dir: &Path) -> Result<Self> {
        let client = create_async_client(&config.crawler)?;
        let cache_dir = base_dir.join(&config.paths.cache_dir);
        let feeds_dir = base_dir.join(&config.paths.feeds_dir);
        Ok(Self {
            config: Arc::new(config),
            client,
            cache_dir,
            feeds_dir,
        })
    }

    /// Normalizer using the site's category override, if any.
    pub fn normalizer_for(&self, site: &SiteConfig) -> ArticleNormalizer {
        let normalizer = ArticleNormalizer::new(&self.config.normalize);
        match &site.category {
            Some(category) => normalizer.with_default_category(category.clone()),
            None => normalizer,
        }
    }

    pub fn store_for(&self, site: &SiteConfig) -> LocalFeedStore {
        LocalFeedStore::new(
            &site.name,
            &self.cache_dir,
            &self.feeds_dir,
            self.normalizer_for(site),
        )
    }

    pub fn feed_meta(&self, site: &SiteConfig) -> FeedMeta {
        FeedMeta::for_site(site, &self.config.feed.self_url_template)
    }
}
