//! Append-only merge of fresh articles into a source's history.
//!
//! History is never rewritten: an article already present keeps its first-seen
//! title, date and description even if the source later changes them.

use std::collections::HashSet;

use crate::models::Article;

/// Result of merging a batch into history.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeResult {
    /// History followed by the genuinely new articles
    pub articles: Vec<Article>,
    /// Number of articles appended
    pub added: usize,
}

impl MergeResult {
    pub fn has_changes(&self) -> bool {
        self.added > 0
    }
}

/// Merge `new` into `history`, keyed by link.
///
/// Links repeated inside `history` itself are collapsed to their first
/// occurrence so the output never holds two articles with the same link.
pub fn merge(new: &[Article], history: Vec<Article>) -> MergeResult {
    let mut seen: HashSet<String> = HashSet::with_capacity(history.len() + new.len());
    let mut articles = Vec::with_capacity(history.len() + new.len());

    for article in history {
        if seen.insert(article.link.clone()) {
            articles.push(article);
        } else {
            log::debug!("Dropping duplicate history entry {}", article.link);
        }
    }

    let before = articles.len();
    for article in new {
        if seen.insert(article.link.clone()) {
            articles.push(article.clone());
        } else {
            log::debug!("Skipping known article {}", article.link);
        }
    }

    let added = articles.len() - before;
    log::info!("Merged {} new article(s), {} total", added, articles.len());

    MergeResult { articles, added }
}
