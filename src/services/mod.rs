//! Site adapters: the only code that knows how a source's pages look.
//!
//! - `HtmlAdapter`: selector-driven extraction from listing pages
//! - `JsonApiAdapter`: paginated JSON content APIs
//!
//! The crawl controller only sees the [`SiteAdapter`] trait.

mod html;
mod json_api;

#[cfg(test)]
pub(crate) mod fixture;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::Result;
use crate::models::{AdapterConfig, RawItem, SiteConfig};

pub use html::HtmlAdapter;
pub use json_api::JsonApiAdapter;

/// Fetch and extract capability for one source.
#[async_trait]
pub trait SiteAdapter: Send + Sync {
    /// Source name, used in logs.
    fn name(&self) -> &str;

    /// Fetch the raw content of a 1-based page.
    ///
    /// Network and HTTP failures are errors; a missing page should be
    /// reported as [`crate::error::AppError::NotFound`].
    async fn fetch_page(&self, page: u32) -> Result<String>;

    /// Extract candidate items from raw page content.
    fn extract_items(&self, raw: &str) -> Result<Vec<RawItem>>;

    /// Whether another page follows this one.
    fn has_more(&self, raw: &str, items: &[RawItem]) -> bool;

    /// Whether a successfully fetched body is really a not-found page.
    fn is_not_found(&self, _raw: &str) -> bool {
        false
    }
}

/// Build the adapter a site is configured for.
pub fn build_adapter(site: &SiteConfig, client: &Client) -> Result<Box<dyn SiteAdapter>> {
    let adapter: Box<dyn SiteAdapter> = match &site.adapter {
        AdapterConfig::Html(config) => Box::new(HtmlAdapter::new(
            &site.name,
            &site.url,
            config.clone(),
            client.clone(),
        )?),
        AdapterConfig::JsonApi(config) => Box::new(JsonApiAdapter::new(
            &site.name,
            &site.url,
            config.clone(),
            client.clone(),
        )?),
    };
    Ok(adapter)
}
