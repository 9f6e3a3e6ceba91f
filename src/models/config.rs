//! Application configuration structures.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::SiteConfig;

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP behavior settings
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Pagination depth per crawl mode
    #[serde(default)]
    pub depth: DepthConfig,

    /// Article validation and fallback rules
    #[serde(default)]
    pub normalize: NormalizeConfig,

    /// Output locations
    #[serde(default)]
    pub paths: PathsConfig,

    /// Published feed settings
    #[serde(default)]
    pub feed: FeedConfig,

    /// Source definitions
    #[serde(default = "defaults::default_sites")]
    pub sites: Vec<SiteConfig>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration, or the defaults when the file does not exist.
    ///
    /// A file that exists but cannot be read or parsed is an error.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            log::warn!("Config file {:?} not found. Using defaults.", path);
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Look up a site by name.
    pub fn site(&self, name: &str) -> Option<&SiteConfig> {
        self.sites.iter().find(|s| s.name == name)
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.crawler.user_agent.trim().is_empty() {
            return Err(AppError::validation("crawler.user_agent is empty"));
        }
        if self.crawler.timeout_secs == 0 {
            return Err(AppError::validation("crawler.timeout_secs must be > 0"));
        }
        if self.depth.full_page_limit == 0 || self.depth.incremental_page_limit == 0 {
            return Err(AppError::validation("depth page limits must be > 0"));
        }
        if self.depth.incremental_page_limit > self.depth.full_page_limit {
            return Err(AppError::validation(
                "depth.incremental_page_limit must not exceed depth.full_page_limit",
            ));
        }
        if self.normalize.fallback_day_range == 0 {
            return Err(AppError::validation(
                "normalize.fallback_day_range must be > 0",
            ));
        }
        if self.normalize.default_category.trim().is_empty() {
            return Err(AppError::validation("normalize.default_category is empty"));
        }
        if !self.feed.self_url_template.contains("{name}") {
            return Err(AppError::validation(
                "feed.self_url_template has no {name} placeholder",
            ));
        }
        if self.sites.is_empty() {
            return Err(AppError::validation("No sites defined"));
        }

        let mut names = HashSet::new();
        for site in &self.sites {
            if !names.insert(site.name.as_str()) {
                return Err(AppError::validation(format!(
                    "duplicate site name '{}'",
                    site.name
                )));
            }
            site.validate()?;
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            crawler: CrawlerConfig::default(),
            depth: DepthConfig::default(),
            normalize: NormalizeConfig::default(),
            paths: PathsConfig::default(),
            feed: FeedConfig::default(),
            sites: defaults::default_sites(),
        }
    }
}

/// HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Delay between page requests in milliseconds
    #[serde(default = "defaults::request_delay")]
    pub request_delay_ms: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            request_delay_ms: defaults::request_delay(),
        }
    }
}

/// Page-limit safety caps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepthConfig {
    #[serde(default = "defaults::full_page_limit")]
    pub full_page_limit: u32,

    #[serde(default = "defaults::incremental_page_limit")]
    pub incremental_page_limit: u32,
}

impl Default for DepthConfig {
    fn default() -> Self {
        Self {
            full_page_limit: defaults::full_page_limit(),
            incremental_page_limit: defaults::incremental_page_limit(),
        }
    }
}

/// Article validation and fallback settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizeConfig {
    /// Shortest accepted title, in grapheme clusters
    #[serde(default = "defaults::min_title_length")]
    pub min_title_length: usize,

    /// First day of the fallback date range
    #[serde(default = "defaults::fallback_epoch")]
    pub fallback_epoch: NaiveDate,

    /// Number of days the fallback date range spans
    #[serde(default = "defaults::fallback_day_range")]
    pub fallback_day_range: u32,

    /// Category when neither the item nor the site has one
    #[serde(default = "defaults::default_category")]
    pub default_category: String,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            min_title_length: defaults::min_title_length(),
            fallback_epoch: defaults::fallback_epoch(),
            fallback_day_range: defaults::fallback_day_range(),
            default_category: defaults::default_category(),
        }
    }
}

/// Output directories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "defaults::cache_dir")]
    pub cache_dir: String,

    #[serde(default = "defaults::feeds_dir")]
    pub feeds_dir: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            cache_dir: defaults::cache_dir(),
            feeds_dir: defaults::feeds_dir(),
        }
    }
}

/// Published feed settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Canonical feed URL with a `{name}` placeholder
    #[serde(default = "defaults::self_url_template")]
    pub self_url_template: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            self_url_template: defaults::self_url_template(),
        }
    }
}

mod defaults {
    use std::collections::BTreeMap;

    use chrono::NaiveDate;

    use crate::models::{AdapterConfig, HtmlAdapterConfig, JsonApiConfig, JsonFields, SiteConfig};

    // Crawler defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; feedcrawl/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn request_delay() -> u64 {
        500
    }

    // Depth defaults
    pub fn full_page_limit() -> u32 {
        30
    }
    pub fn incremental_page_limit() -> u32 {
        3
    }

    // Normalize defaults
    pub fn min_title_length() -> usize {
        5
    }
    pub fn fallback_epoch() -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 1, 1).unwrap_or_default()
    }
    pub fn fallback_day_range() -> u32 {
        730
    }
    pub fn default_category() -> String {
        "News".into()
    }

    // Path defaults
    pub fn cache_dir() -> String {
        "cache".into()
    }
    pub fn feeds_dir() -> String {
        "feeds".into()
    }
    pub fn self_url_template() -> String {
        "https://raw.githubusercontent.com/Olshansk/rss-feeds/main/feeds/feed_{name}.xml".into()
    }

    // Site defaults
    pub fn default_sites() -> Vec<SiteConfig> {
        vec![
            SiteConfig {
                name: "dagster".to_string(),
                title: "Dagster Blog".to_string(),
                description: "Insights, tutorials, and updates on data engineering and orchestration from the Dagster team".to_string(),
                url: "https://dagster.io/blog".to_string(),
                language: "en".to_string(),
                category: Some("Blog".to_string()),
                adapter: AdapterConfig::Html(HtmlAdapterConfig {
                    page_url_template: Some(
                        "https://dagster.io/blog?a17fdf47_page={page}".to_string(),
                    ),
                    item_selector: "div.blog_card, div.featured_blog_link".to_string(),
                    title_selectors: vec![
                        "h3.blog_card_title".to_string(),
                        "h2.heading-style-h5".to_string(),
                        "h3".to_string(),
                        "h2".to_string(),
                    ],
                    link_selector: Some("a.clickable_link".to_string()),
                    link_attr: "href".to_string(),
                    date_selectors: vec!["p.text-color-neutral-500".to_string()],
                    category_selectors: Vec::new(),
                    description_selectors: vec![
                        "p[fs-cmsfilter-field=\"description\"]".to_string(),
                        "p.text-color-neutral-700".to_string(),
                    ],
                    link_pattern: None,
                    exclude_link_pattern: None,
                    next_page_selector: Some("a.w-pagination-next".to_string()),
                    not_found_markers: Vec::new(),
                }),
            },
            SiteConfig {
                name: "the_batch".to_string(),
                title: "The Batch | DeepLearning.AI".to_string(),
                description: "Weekly AI news and insights from DeepLearning.AI's The Batch".to_string(),
                url: "https://www.deeplearning.ai/the-batch/".to_string(),
                language: "en".to_string(),
                category: None,
                adapter: AdapterConfig::Html(HtmlAdapterConfig {
                    page_url_template: Some(
                        "https://www.deeplearning.ai/the-batch/page/{page}/".to_string(),
                    ),
                    item_selector: "article".to_string(),
                    title_selectors: vec![
                        "h1".to_string(),
                        "h2".to_string(),
                        "h3".to_string(),
                        "h4".to_string(),
                    ],
                    link_selector: None,
                    link_attr: "href".to_string(),
                    date_selectors: vec!["time".to_string()],
                    category_selectors: Vec::new(),
                    description_selectors: vec![
                        "div[class*='line-clamp']".to_string(),
                        "p[class*='line-clamp']".to_string(),
                        "p".to_string(),
                    ],
                    link_pattern: Some("/the-batch/".to_string()),
                    exclude_link_pattern: Some("/tag/".to_string()),
                    next_page_selector: None,
                    not_found_markers: vec!["Page not found".to_string()],
                }),
            },
            SiteConfig {
                name: "langchain".to_string(),
                title: "LangChain Blog".to_string(),
                description: "Latest posts from the LangChain blog".to_string(),
                url: "https://blog.langchain.com".to_string(),
                language: "en".to_string(),
                category: Some("Blog".to_string()),
                adapter: AdapterConfig::JsonApi(JsonApiConfig {
                    endpoint: "https://langchain-blog.ghost.io/ghost/api/content/posts/"
                        .to_string(),
                    page_param: "page".to_string(),
                    per_page_param: Some("limit".to_string()),
                    per_page: 15,
                    query: BTreeMap::from([
                        ("key".to_string(), "e411fdfa6f54398669f416d1f0".to_string()),
                        (
                            "fields".to_string(),
                            "title,url,slug,published_at,excerpt".to_string(),
                        ),
                    ]),
                    items_pointer: "/posts".to_string(),
                    fields: JsonFields {
                        title: "/title".to_string(),
                        link: "/url".to_string(),
                        date: Some("/published_at".to_string()),
                        description: Some("/excerpt".to_string()),
                        category: None,
                    },
                    next_pointer: Some("/meta/pagination/next".to_string()),
                }),
            },
        ]
    }
}
