//! Article data structures.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A normalized article, keyed by its absolute link.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Article {
    /// Article headline
    pub title: String,

    /// Absolute HTTP(S) URL, unique per source
    pub link: String,

    /// Publish date (or its stable fallback)
    pub date: DateTime<Utc>,

    /// Free-text category label
    pub category: String,

    /// Summary text, the title when the source has none
    pub description: String,
}

/// A candidate record as extracted by a site adapter, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawItem {
    pub title: Option<String>,
    pub link: Option<String>,
    pub date: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
}

impl RawItem {
    /// Create a raw item with a title and link only.
    pub fn new(title: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            link: Some(link.into()),
            ..Self::default()
        }
    }

    /// Set the raw date text.
    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    /// Set the raw category text.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Set the raw description text.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Lenient view of a cached article.
///
/// Older cache files may hold dates in other formats or miss fields entirely,
/// so every field is read as optional text and repaired on load.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoredArticle {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_article_json_shape() {
        let article = Article {
            title: "Shipping incremental feeds".to_string(),
            link: "https://example.com/blog/incremental".to_string(),
            date: Utc.with_ymd_and_hms(2025, 3, 14, 0, 0, 0).unwrap(),
            category: "Engineering".to_string(),
            description: "How we stopped re-crawling everything".to_string(),
        };

        let value = serde_json::to_value(&article).unwrap();
        assert_eq!(value["link"], "https://example.com/blog/incremental");
        assert_eq!(value["date"], "2025-03-14T00:00:00Z");
    }

    #[test]
    fn test_stored_article_tolerates_missing_fields() {
        let stored: StoredArticle =
            serde_json::from_str(r#"{"link": "https://example.com/a", "date": "yesterday"}"#)
                .unwrap();
        assert_eq!(stored.link.as_deref(), Some("https://example.com/a"));
        assert_eq!(stored.date.as_deref(), Some("yesterday"));
        assert!(stored.title.is_none());
        assert!(stored.description.is_none());
    }
}
