// src/services/json_api.rs

//! Adapter for paginated JSON content APIs.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{JsonApiConfig, RawItem};
use crate::services::SiteAdapter;
use crate::utils::http::fetch_text;
use crate::utils::{normalize_whitespace, resolve_url};

/// Reads items from a JSON endpoint using JSON Pointers.
pub struct JsonApiAdapter {
    name: String,
    base_url: Url,
    endpoint: Url,
    config: JsonApiConfig,
    client: Client,
}

impl JsonApiAdapter {
    pub fn new(name: &str, site_url: &str, config: JsonApiConfig, client: Client) -> Result<Self> {
        Ok(Self {
            name: name.to_string(),
            base_url: Url::parse(site_url)?,
            endpoint: Url::parse(&config.endpoint)?,
            config,
            client,
        })
    }

    /// Endpoint URL for a 1-based page, static query parameters included.
    pub fn page_url(&self, page: u32) -> Url {
        let mut url = self.endpoint.clone();
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &self.config.query {
                pairs.append_pair(key, value);
            }
            pairs.append_pair(&self.config.page_param, &page.to_string());
            if let Some(param) = &self.config.per_page_param {
                pairs.append_pair(param, &self.config.per_page.to_string());
            }
        }
        url
    }

    fn parse_body(&self, raw: &str) -> Result<Value> {
        serde_json::from_str(raw)
            .map_err(|e| AppError::parse(format!("{} response", self.name), e.to_string()))
    }

    fn to_raw_item(&self, item: &Value) -> RawItem {
        let fields = &self.config.fields;
        let field = |pointer: Option<&String>| pointer.and_then(|p| text_at(item, p));

        RawItem {
            title: field(Some(&fields.title)),
            link: field(Some(&fields.link)).map(|href| resolve_url(&self.base_url, &href)),
            date: field(fields.date.as_ref()),
            category: field(fields.category.as_ref()),
            description: field(fields.description.as_ref()),
        }
    }
}

/// Text at a JSON Pointer; strings are whitespace-normalized, scalars stringified.
fn text_at(value: &Value, pointer: &str) -> Option<String> {
    let text = match value.pointer(pointer)? {
        Value::String(s) => normalize_whitespace(s),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

#[async_trait]
impl SiteAdapter for JsonApiAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_page(&self, page: u32) -> Result<String> {
        let url = self.page_url(page);
        log::debug!("[{}] GET {}", self.name, url);
        fetch_text(&self.client, url.as_str()).await
    }

    fn extract_items(&self, raw: &str) -> Result<Vec<RawItem>> {
        let body = self.parse_body(raw)?;
        let items = body
            .pointer(&self.config.items_pointer)
            .and_then(Value::as_array)
            .ok_or_else(|| {
                AppError::parse(
                    format!("{} response", self.name),
                    format!("no array at '{}'", self.config.items_pointer),
                )
            })?;

        Ok(items.iter().map(|item| self.to_raw_item(item)).collect())
    }

    fn has_more(&self, raw: &str, items: &[RawItem]) -> bool {
        match &self.config.next_pointer {
            Some(pointer) => self
                .parse_body(raw)
                .ok()
                .and_then(|body| body.pointer(pointer).cloned())
                .is_some_and(|next| !next.is_null() && next != Value::Bool(false)),
            None => items.len() >= self.config.per_page,
        }
    }
}
