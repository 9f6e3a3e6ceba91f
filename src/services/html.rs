// src/services/html.rs

//! Selector-driven HTML listing adapter.
//!
//! Each card matched by `item_selector` becomes one [`RawItem`]. Title, date,
//! category and description are read through fallback chains of selectors so
//! that a layout change only breaks the first choice, not the whole feed.

use std::collections::HashSet;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{HtmlAdapterConfig, RawItem};
use crate::pipeline::normalize::parse_date;
use crate::services::SiteAdapter;
use crate::utils::http::fetch_text;
use crate::utils::{normalize_whitespace, resolve_url};

/// Compiled selectors for one site.
struct CardSelectors {
    item: Selector,
    titles: Vec<Selector>,
    link: Option<Selector>,
    anchor: Selector,
    dates: Vec<Selector>,
    categories: Vec<Selector>,
    descriptions: Vec<Selector>,
    next_page: Option<Selector>,
}

impl CardSelectors {
    fn compile(config: &HtmlAdapterConfig) -> Result<Self> {
        Ok(Self {
            item: parse_selector(&config.item_selector)?,
            titles: parse_all(&config.title_selectors)?,
            link: config.link_selector.as_deref().map(parse_selector).transpose()?,
            anchor: parse_selector("a[href]")?,
            dates: parse_all(&config.date_selectors)?,
            categories: parse_all(&config.category_selectors)?,
            descriptions: parse_all(&config.description_selectors)?,
            next_page: config
                .next_page_selector
                .as_deref()
                .map(parse_selector)
                .transpose()?,
        })
    }
}

enum LinkLookup {
    Found(String),
    /// Anchors exist but none pass the link patterns
    Filtered,
    Missing,
}

/// Adapter for sites whose listing pages are plain HTML.
pub struct HtmlAdapter {
    name: String,
    base_url: Url,
    config: HtmlAdapterConfig,
    selectors: CardSelectors,
    link_pattern: Option<Regex>,
    exclude_link_pattern: Option<Regex>,
    month_day: Regex,
    client: Client,
}

impl HtmlAdapter {
    /// Create an adapter, compiling all selectors and patterns up front.
    pub fn new(
        name: &str,
        site_url: &str,
        config: HtmlAdapterConfig,
        client: Client,
    ) -> Result<Self> {
        let selectors = CardSelectors::compile(&config)?;
        let link_pattern = config.link_pattern.as_deref().map(compile_pattern).transpose()?;
        let exclude_link_pattern = config
            .exclude_link_pattern
            .as_deref()
            .map(compile_pattern)
            .transpose()?;
        let month_day =
            compile_pattern(r"(?i)\b(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?\s+\d{1,2}\b")?;

        Ok(Self {
            name: name.to_string(),
            base_url: Url::parse(site_url)?,
            config,
            selectors,
            link_pattern,
            exclude_link_pattern,
            month_day,
            client,
        })
    }

    /// URL of a 1-based page, if the site paginates that far.
    pub fn page_url(&self, page: u32) -> Option<String> {
        if page <= 1 {
            return Some(self.base_url.to_string());
        }
        self.config
            .page_url_template
            .as_ref()
            .map(|template| template.replace("{page}", &page.to_string()))
    }

    fn extract_card(&self, card: &ElementRef) -> Option<RawItem> {
        let link = match self.extract_link(card) {
            LinkLookup::Found(link) => Some(link),
            LinkLookup::Filtered => return None,
            LinkLookup::Missing => None,
        };
        let date = self.extract_date(card);
        let category = self.extract_category(card, date.as_deref());

        Some(RawItem {
            title: first_text(card, &self.selectors.titles),
            link,
            date,
            category,
            description: first_text(card, &self.selectors.descriptions),
        })
    }

    fn extract_link(&self, card: &ElementRef) -> LinkLookup {
        let candidates: Vec<ElementRef> = match &self.selectors.link {
            Some(sel) => card.select(sel).collect(),
            None => {
                let own = (card.value().name() == "a").then_some(*card);
                own.into_iter().chain(card.select(&self.selectors.anchor)).collect()
            }
        };

        let mut any = false;
        for el in candidates {
            let Some(href) = el.value().attr(&self.config.link_attr) else {
                continue;
            };
            let href = href.trim();
            if href.is_empty() || href.starts_with('#') {
                continue;
            }
            any = true;
            let link = resolve_url(&self.base_url, href);
            if self.link_allowed(&link) {
                return LinkLookup::Found(link);
            }
        }

        if any {
            LinkLookup::Filtered
        } else {
            LinkLookup::Missing
        }
    }

    fn link_allowed(&self, link: &str) -> bool {
        // The listing page itself shows up as a card link on some layouts.
        if link.trim_end_matches('/') == self.base_url.as_str().trim_end_matches('/') {
            return false;
        }
        if let Some(re) = &self.link_pattern {
            if !re.is_match(link) {
                return false;
            }
        }
        if let Some(re) = &self.exclude_link_pattern {
            if re.is_match(link) {
                return false;
            }
        }
        true
    }

    /// First candidate that parses as a date, else the first non-empty text.
    fn extract_date(&self, card: &ElementRef) -> Option<String> {
        let mut first_seen = None;
        for sel in &self.selectors.dates {
            for el in card.select(sel) {
                let text = el
                    .value()
                    .attr("datetime")
                    .map(normalize_whitespace)
                    .filter(|t| !t.is_empty())
                    .unwrap_or_else(|| element_text(&el));
                if text.is_empty() {
                    continue;
                }
                if parse_date(&text).is_some() {
                    return Some(text);
                }
                first_seen.get_or_insert(text);
            }
        }
        first_seen
    }

    fn extract_category(&self, card: &ElementRef, date_text: Option<&str>) -> Option<String> {
        for sel in &self.selectors.categories {
            for el in card.select(sel) {
                let text = element_text(&el);
                if text.is_empty() || Some(text.as_str()) == date_text {
                    continue;
                }
                if parse_date(&text).is_some() || self.month_day.is_match(&text) {
                    continue;
                }
                return Some(text);
            }
        }
        None
    }
}

#[async_trait]
impl SiteAdapter for HtmlAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_page(&self, page: u32) -> Result<String> {
        let url = self
            .page_url(page)
            .ok_or_else(|| AppError::not_found(format!("{} page {}", self.name, page)))?;
        log::debug!("[{}] GET {}", self.name, url);
        fetch_text(&self.client, &url).await
    }

    fn extract_items(&self, raw: &str) -> Result<Vec<RawItem>> {
        let document = Html::parse_document(raw);
        let mut seen = HashSet::new();
        let mut items = Vec::new();

        for card in document.select(&self.selectors.item) {
            let Some(item) = self.extract_card(&card) else {
                continue;
            };
            if let Some(link) = &item.link {
                if !seen.insert(link.clone()) {
                    continue;
                }
            }
            items.push(item);
        }

        log::debug!("[{}] extracted {} cards", self.name, items.len());
        Ok(items)
    }

    fn has_more(&self, raw: &str, items: &[RawItem]) -> bool {
        match &self.selectors.next_page {
            Some(next) => Html::parse_document(raw).select(next).any(|el| {
                el.value().name() != "a"
                    || el.value().attr("href").is_some_and(|h| !h.trim().is_empty())
            }),
            None => self.config.page_url_template.is_some() && !items.is_empty(),
        }
    }

    fn is_not_found(&self, raw: &str) -> bool {
        self.config
            .not_found_markers
            .iter()
            .any(|marker| raw.contains(marker.as_str()))
    }
}

fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

fn parse_all(selectors: &[String]) -> Result<Vec<Selector>> {
    selectors.iter().map(|s| parse_selector(s)).collect()
}

fn compile_pattern(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| AppError::config(format!("bad pattern '{pattern}': {e}")))
}

fn element_text(el: &ElementRef) -> String {
    normalize_whitespace(&el.text().collect::<String>())
}

fn first_text(card: &ElementRef, selectors: &[Selector]) -> Option<String> {
    selectors.iter().find_map(|sel| {
        card.select(sel)
            .map(|el| element_text(&el))
            .find(|text| !text.is_empty())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r##"
        <html><body>
          <a href="/blog">Blog home</a>
          <div class="card">
            <a class="link" href="/blog/first-post"><h3>First post title</h3></a>
            <span class="tag">Engineering</span>
            <time datetime="2025-01-15">Jan 15, 2025</time>
            <p class="summary">A  summary
               of the first post</p>
          </div>
          <div class="card">
            <a class="link" href="https://example.com/blog/second-post"><h3>Second post title</h3></a>
            <span class="tag">Feb 2, 2025</span>
            <p class="date">Feb 2, 2025</p>
          </div>
          <div class="card">
            <a class="link" href="/blog/first-post"><h3>Duplicate card</h3></a>
          </div>
          <div class="card">
            <h3>Card without a link</h3>
          </div>
          <a class="next" href="/blog?page=2">Next</a>
        </body></html>
    "##;

    fn config() -> HtmlAdapterConfig {
        HtmlAdapterConfig {
            page_url_template: Some("https://example.com/blog?page={page}".to_string()),
            item_selector: "div.card".to_string(),
            title_selectors: vec!["h2".to_string(), "h3".to_string()],
            link_selector: Some("a.link".to_string()),
            link_attr: "href".to_string(),
            date_selectors: vec!["time".to_string(), "p.date".to_string()],
            category_selectors: vec!["span.tag".to_string()],
            description_selectors: vec!["p.summary".to_string()],
            link_pattern: None,
            exclude_link_pattern: None,
            next_page_selector: Some("a.next".to_string()),
            not_found_markers: vec!["Page not found".to_string()],
        }
    }

    fn adapter(config: HtmlAdapterConfig) -> HtmlAdapter {
        HtmlAdapter::new("example", "https://example.com/blog", config, Client::new()).unwrap()
    }

    #[test]
    fn test_extracts_cards_with_fallback_chains() {
        let items = adapter(config()).extract_items(LISTING).unwrap();
        assert_eq!(items.len(), 3);

        let first = &items[0];
        assert_eq!(first.title.as_deref(), Some("First post title"));
        assert_eq!(first.link.as_deref(), Some("https://example.com/blog/first-post"));
        assert_eq!(first.date.as_deref(), Some("2025-01-15"));
        assert_eq!(first.category.as_deref(), Some("Engineering"));
        assert_eq!(first.description.as_deref(), Some("A summary of the first post"));

        let second = &items[1];
        assert_eq!(second.date.as_deref(), Some("Feb 2, 2025"));
        assert_eq!(second.category, None, "date-like categories are skipped");
        assert_eq!(second.description, None);

        let unlinked = &items[2];
        assert_eq!(unlinked.title.as_deref(), Some("Card without a link"));
        assert_eq!(unlinked.link, None);
    }

    #[test]
    fn test_link_patterns_pick_first_allowed_anchor() {
        let html = r#"
            <article>
              <a href="/the-batch/tag/letters/">Letters</a>
              <a href="/the-batch/issue-300/"><h2>Issue 300 is out</h2></a>
            </article>
            <article>
              <a href="/the-batch/tag/research/">Research only</a>
            </article>
        "#;
        let mut cfg = config();
        cfg.item_selector = "article".to_string();
        cfg.link_selector = None;
        cfg.link_pattern = Some("/the-batch/".to_string());
        cfg.exclude_link_pattern = Some("/tag/".to_string());

        let items = adapter(cfg).extract_items(html).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(
            items[0].link.as_deref(),
            Some("https://example.com/the-batch/issue-300/")
        );
    }

    #[test]
    fn test_page_urls() {
        let a = adapter(config());
        assert_eq!(a.page_url(1).as_deref(), Some("https://example.com/blog"));
        assert_eq!(
            a.page_url(3).as_deref(),
            Some("https://example.com/blog?page=3")
        );

        let mut single = config();
        single.page_url_template = None;
        assert_eq!(adapter(single).page_url(2), None);
    }

    #[test]
    fn test_has_more_and_not_found() {
        let a = adapter(config());
        let items = a.extract_items(LISTING).unwrap();
        assert!(a.has_more(LISTING, &items));
        assert!(!a.has_more("<html><a class=\"next\">Next</a></html>", &items));
        assert!(a.is_not_found("<h1>Page not found</h1>"));
        assert!(!a.is_not_found(LISTING));
    }

    #[test]
    fn test_has_more_without_next_selector_follows_items() {
        let mut cfg = config();
        cfg.next_page_selector = None;
        let a = adapter(cfg);
        assert!(a.has_more("", &[RawItem::new("t", "https://example.com/x")]));
        assert!(!a.has_more("", &[]));
    }

    #[test]
    fn test_invalid_selector_is_rejected() {
        let mut cfg = config();
        cfg.item_selector = "div[".to_string();
        let result = HtmlAdapter::new("bad", "https://example.com", cfg, Client::new());
        assert!(matches!(result, Err(AppError::Selector { .. })));
    }
}
