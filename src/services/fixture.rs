//! In-memory adapter for pipeline tests.

use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::models::RawItem;
use crate::services::SiteAdapter;

/// What a fixture page does when requested.
#[derive(Debug, Clone)]
pub enum FixturePage {
    Items(Vec<RawItem>),
    NotFound,
    Unreachable,
    Malformed,
}

/// Serves a fixed list of pages; anything past the end is not found.
pub struct FixtureAdapter {
    pages: Vec<FixturePage>,
    fetches: AtomicU32,
}

impl FixtureAdapter {
    pub fn new(pages: Vec<FixturePage>) -> Self {
        Self {
            pages,
            fetches: AtomicU32::new(0),
        }
    }

    /// Pages of items only.
    pub fn with_items(pages: Vec<Vec<RawItem>>) -> Self {
        Self::new(pages.into_iter().map(FixturePage::Items).collect())
    }

    pub fn fetches(&self) -> u32 {
        self.fetches.load(Ordering::SeqCst)
    }

    fn page(&self, page: u32) -> Option<&FixturePage> {
        self.pages.get(page.checked_sub(1)? as usize)
    }
}

#[async_trait]
impl SiteAdapter for FixtureAdapter {
    fn name(&self) -> &str {
        "fixture"
    }

    async fn fetch_page(&self, page: u32) -> Result<String> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let url = format!("fixture://page/{page}");
        match self.page(page) {
            None | Some(FixturePage::NotFound) => Err(AppError::not_found(url)),
            Some(FixturePage::Unreachable) => Err(AppError::fetch(url, "connection refused")),
            Some(_) => Ok(page.to_string()),
        }
    }

    fn extract_items(&self, raw: &str) -> Result<Vec<RawItem>> {
        let page: u32 = raw
            .parse()
            .map_err(|e| AppError::parse("fixture page", e))?;
        match self.page(page) {
            Some(FixturePage::Items(items)) => Ok(items.clone()),
            _ => Err(AppError::parse("fixture page", "malformed body")),
        }
    }

    fn has_more(&self, raw: &str, _items: &[RawItem]) -> bool {
        raw.parse::<usize>()
            .map(|page| page < self.pages.len())
            .unwrap_or(false)
    }
}
