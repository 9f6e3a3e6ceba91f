// src/models/site.rs

//! Site definitions: where a source lives and how its pages are read.

use std::collections::BTreeMap;

use regex::Regex;
use scraper::Selector;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// A single source that gets its own history and feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Identifier used for cache and feed file names (e.g. "dagster")
    pub name: String,

    /// Feed channel title
    pub title: String,

    /// Feed channel description
    #[serde(default)]
    pub description: String,

    /// Source site URL, rendered as the channel `<link>`
    pub url: String,

    /// Feed language code
    #[serde(default = "default_language")]
    pub language: String,

    /// Category used when an item has none (overrides `normalize.default_category`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    /// How pages are fetched and items extracted
    pub adapter: AdapterConfig,
}

fn default_language() -> String {
    "en".to_string()
}

impl SiteConfig {
    /// Validate names, URLs, selectors and patterns.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty()
            || !self
                .name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(AppError::validation(format!(
                "site name '{}' must be non-empty and use only [A-Za-z0-9_-]",
                self.name
            )));
        }
        if self.title.trim().is_empty() {
            return Err(AppError::validation(format!(
                "site '{}' has an empty title",
                self.name
            )));
        }
        require_http_url(&self.name, "url", &self.url)?;

        match &self.adapter {
            AdapterConfig::Html(html) => html.validate(&self.name),
            AdapterConfig::JsonApi(api) => api.validate(&self.name),
        }
    }
}

fn require_http_url(site: &str, field: &str, value: &str) -> Result<()> {
    let parsed = url::Url::parse(value)
        .map_err(|e| AppError::validation(format!("site '{site}': {field} is invalid: {e}")))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(AppError::validation(format!(
            "site '{site}': {field} must be an http(s) URL"
        )));
    }
    Ok(())
}

fn check_selector(site: &str, selector: &str) -> Result<()> {
    Selector::parse(selector)
        .map(|_| ())
        .map_err(|e| AppError::selector(selector, format!("site '{site}': {e:?}")))
}

fn check_pattern(site: &str, pattern: &str) -> Result<()> {
    Regex::new(pattern)
        .map(|_| ())
        .map_err(|e| AppError::validation(format!("site '{site}': bad pattern '{pattern}': {e}")))
}

/// Adapter selection, tagged by `kind`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AdapterConfig {
    Html(HtmlAdapterConfig),
    JsonApi(JsonApiConfig),
}

/// Selector-driven extraction from listing pages.
///
/// Every `*_selectors` list is a fallback chain: the first selector that
/// yields non-empty text wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HtmlAdapterConfig {
    /// URL of page N with a `{page}` placeholder; page 1 always uses the site URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_url_template: Option<String>,

    /// Selector for each article card
    pub item_selector: String,

    /// Title candidates within a card
    #[serde(default = "defaults::title_selectors")]
    pub title_selectors: Vec<String>,

    /// Link element within a card (the card itself or its first anchor if unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_selector: Option<String>,

    /// Attribute holding the link
    #[serde(default = "defaults::link_attr")]
    pub link_attr: String,

    /// Date candidates within a card
    #[serde(default = "defaults::date_selectors")]
    pub date_selectors: Vec<String>,

    /// Category candidates within a card
    #[serde(default)]
    pub category_selectors: Vec<String>,

    /// Description candidates within a card
    #[serde(default)]
    pub description_selectors: Vec<String>,

    /// Keep only links matching this regex
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_pattern: Option<String>,

    /// Drop links matching this regex
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_link_pattern: Option<String>,

    /// Presence of this element means another page exists
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_selector: Option<String>,

    /// Body substrings that mark a missing page
    #[serde(default)]
    pub not_found_markers: Vec<String>,
}

impl HtmlAdapterConfig {
    fn validate(&self, site: &str) -> Result<()> {
        let mut selectors: Vec<&str> = vec![self.item_selector.as_str()];
        selectors.extend(self.title_selectors.iter().map(String::as_str));
        selectors.extend(self.date_selectors.iter().map(String::as_str));
        selectors.extend(self.category_selectors.iter().map(String::as_str));
        selectors.extend(self.description_selectors.iter().map(String::as_str));
        selectors.extend(self.link_selector.as_deref());
        selectors.extend(self.next_page_selector.as_deref());

        for selector in selectors {
            check_selector(site, selector)?;
        }
        if self.title_selectors.is_empty() {
            return Err(AppError::validation(format!(
                "site '{site}': title_selectors is empty"
            )));
        }
        for pattern in [&self.link_pattern, &self.exclude_link_pattern]
            .into_iter()
            .flatten()
        {
            check_pattern(site, pattern)?;
        }
        if let Some(template) = &self.page_url_template {
            if !template.contains("{page}") {
                return Err(AppError::validation(format!(
                    "site '{site}': page_url_template has no {{page}} placeholder"
                )));
            }
            require_http_url(site, "page_url_template", &template.replace("{page}", "2"))?;
        }
        Ok(())
    }
}

/// Paginated JSON API (e.g. a Ghost content API).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonApiConfig {
    /// Endpoint URL without pagination parameters
    pub endpoint: String,

    /// Query parameter carrying the page number
    #[serde(default = "defaults::page_param")]
    pub page_param: String,

    /// Query parameter carrying the page size
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_page_param: Option<String>,

    /// Page size sent with `per_page_param`
    #[serde(default = "defaults::per_page")]
    pub per_page: usize,

    /// Static query parameters (API keys, field lists)
    #[serde(default)]
    pub query: BTreeMap<String, String>,

    /// JSON Pointer to the item array
    pub items_pointer: String,

    /// JSON Pointers to fields, relative to each item
    pub fields: JsonFields,

    /// JSON Pointer whose non-null value means another page exists
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_pointer: Option<String>,
}

impl JsonApiConfig {
    fn validate(&self, site: &str) -> Result<()> {
        require_http_url(site, "endpoint", &self.endpoint)?;
        if self.per_page == 0 {
            return Err(AppError::validation(format!(
                "site '{site}': per_page must be > 0"
            )));
        }
        let pointers = [
            Some(&self.items_pointer),
            Some(&self.fields.title),
            Some(&self.fields.link),
            self.fields.date.as_ref(),
            self.fields.description.as_ref(),
            self.fields.category.as_ref(),
            self.next_pointer.as_ref(),
        ];
        for pointer in pointers.into_iter().flatten() {
            if !pointer.is_empty() && !pointer.starts_with('/') {
                return Err(AppError::validation(format!(
                    "site '{site}': '{pointer}' is not a JSON Pointer"
                )));
            }
        }
        Ok(())
    }
}

/// Field locations inside one JSON item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonFields {
    pub title: String,
    pub link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// Channel-level metadata for a rendered feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedMeta {
    pub name: String,
    pub title: String,
    pub description: String,
    pub language: String,
    /// Source site, rendered as `<link>` and `atom:link rel="alternate"`
    pub site_url: String,
    /// Canonical feed URL, rendered as `atom:link rel="self"`
    pub self_url: String,
}

impl FeedMeta {
    /// Build feed metadata for a site using the `{name}` self URL template.
    pub fn for_site(site: &SiteConfig, self_url_template: &str) -> Self {
        Self {
            name: site.name.clone(),
            title: site.title.clone(),
            description: if site.description.is_empty() {
                site.title.clone()
            } else {
                site.description.clone()
            },
            language: site.language.clone(),
            site_url: site.url.clone(),
            self_url: self_url_template.replace("{name}", &site.name),
        }
    }
}

mod defaults {
    pub fn title_selectors() -> Vec<String> {
        vec!["h1".into(), "h2".into(), "h3".into(), "h4".into()]
    }
    pub fn date_selectors() -> Vec<String> {
        vec!["time".into()]
    }
    pub fn link_attr() -> String {
        "href".into()
    }
    pub fn page_param() -> String {
        "page".into()
    }
    pub fn per_page() -> usize {
        15
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn html_site() -> SiteConfig {
        toml::from_str(
            r#"
            name = "dagster"
            title = "Dagster Blog"
            url = "https://dagster.io/blog"

            [adapter]
            kind = "html"
            page_url_template = "https://dagster.io/blog?a17fdf47_page={page}"
            item_selector = "div.blog_card"
            link_selector = "a.clickable_link"
            next_page_selector = "a.w-pagination-next"
            "#,
        )
        .unwrap()
    }

    #[test]
    fn test_html_site_defaults() {
        let site = html_site();
        assert_eq!(site.language, "en");
        let AdapterConfig::Html(html) = &site.adapter else {
            panic!("expected html adapter");
        };
        assert_eq!(html.link_attr, "href");
        assert_eq!(html.date_selectors, vec!["time".to_string()]);
        assert!(site.validate().is_ok());
    }

    #[test]
    fn test_json_site_parses() {
        let site: SiteConfig = toml::from_str(
            r#"
            name = "langchain"
            title = "LangChain Blog"
            url = "https://blog.langchain.com"

            [adapter]
            kind = "json_api"
            endpoint = "https://langchain-blog.ghost.io/ghost/api/content/posts/"
            per_page_param = "limit"
            items_pointer = "/posts"
            next_pointer = "/meta/pagination/next"

            [adapter.query]
            key = "abc"

            [adapter.fields]
            title = "/title"
            link = "/url"
            date = "/published_at"
            "#,
        )
        .unwrap();
        assert!(matches!(site.adapter, AdapterConfig::JsonApi(_)));
        assert!(site.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_selector() {
        let mut site = html_site();
        if let AdapterConfig::Html(html) = &mut site.adapter {
            html.item_selector = "[[broken".to_string();
        }
        assert!(matches!(site.validate(), Err(AppError::Selector { .. })));
    }

    #[test]
    fn test_validate_rejects_unsafe_name() {
        let mut site = html_site();
        site.name = "../escape".to_string();
        assert!(site.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_template_without_placeholder() {
        let mut site = html_site();
        if let AdapterConfig::Html(html) = &mut site.adapter {
            html.page_url_template = Some("https://dagster.io/blog?page=2".to_string());
        }
        assert!(site.validate().is_err());
    }

    #[test]
    fn test_feed_meta_self_url() {
        let meta = FeedMeta::for_site(
            &html_site(),
            "https://example.github.io/feeds/feed_{name}.xml",
        );
        assert_eq!(meta.self_url, "https://example.github.io/feeds/feed_dagster.xml");
        assert_eq!(meta.site_url, "https://dagster.io/blog");
        assert_eq!(meta.description, "Dagster Blog");
    }
}
