// src/pipeline/normalize.rs

//! Raw item validation and normalization into [`Article`]s.
//!
//! Dates are parsed tolerantly. When no date can be recovered, a fallback is
//! derived from a SHA-256 of the link so the same URL maps to the same day on
//! every run and every machine.

use chrono::{DateTime, Days, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use regex::Regex;
use sha2::{Digest, Sha256};
use thiserror::Error;
use unicode_segmentation::UnicodeSegmentation;

use crate::models::{Article, NormalizeConfig, RawItem, StoredArticle};
use crate::utils::{is_http_url, normalize_whitespace};

/// Why a raw item was not turned into an article.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectReason {
    #[error("missing title")]
    MissingTitle,
    #[error("title too short ({len} < {min})")]
    TitleTooShort { len: usize, min: usize },
    #[error("missing link")]
    MissingLink,
    #[error("link is not an absolute http(s) URL: {0}")]
    InvalidLink(String),
}

/// Date-only formats tried after the full timestamp formats.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%b %d, %Y",
    "%B %d, %Y",
    "%b %d %Y",
    "%B %d %Y",
    "%d %B %Y",
    "%d %b %Y",
    "%m/%d/%Y",
];

/// Naive timestamp formats, interpreted as UTC.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
];

/// Deterministic fallback dates over a fixed day range.
#[derive(Debug, Clone)]
pub struct FallbackDates {
    epoch: NaiveDate,
    day_range: u32,
}

impl FallbackDates {
    pub fn new(epoch: NaiveDate, day_range: u32) -> Self {
        Self {
            epoch,
            day_range: day_range.max(1),
        }
    }

    /// Stable date for an identifier: epoch + (sha256(identifier) mod range) days.
    pub fn date_for(&self, identifier: &str) -> DateTime<Utc> {
        let digest = Sha256::digest(identifier.as_bytes());
        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&digest[..8]);
        let offset = u64::from_be_bytes(prefix) % u64::from(self.day_range);

        let day = self
            .epoch
            .checked_add_days(Days::new(offset))
            .unwrap_or(self.epoch);
        Utc.from_utc_datetime(&day.and_time(NaiveTime::MIN))
    }
}

/// Validates raw items and fills in fallbacks.
#[derive(Debug, Clone)]
pub struct ArticleNormalizer {
    min_title_length: usize,
    default_category: String,
    fallback: FallbackDates,
}

impl ArticleNormalizer {
    pub fn new(config: &NormalizeConfig) -> Self {
        Self {
            min_title_length: config.min_title_length,
            default_category: config.default_category.clone(),
            fallback: FallbackDates::new(config.fallback_epoch, config.fallback_day_range),
        }
    }

    /// Use a site-specific default category.
    pub fn with_default_category(mut self, category: impl Into<String>) -> Self {
        self.default_category = category.into();
        self
    }

    pub fn fallback(&self) -> &FallbackDates {
        &self.fallback
    }

    /// Turn a raw item into an article or say why not.
    pub fn normalize(&self, item: &RawItem) -> Result<Article, RejectReason> {
        let title = clean(item.title.as_deref()).ok_or(RejectReason::MissingTitle)?;
        let len = title.graphemes(true).count();
        if len < self.min_title_length {
            return Err(RejectReason::TitleTooShort {
                len,
                min: self.min_title_length,
            });
        }

        let link = item
            .link
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .ok_or(RejectReason::MissingLink)?;
        if !is_http_url(link) {
            return Err(RejectReason::InvalidLink(link.to_string()));
        }

        let date = match item.date.as_deref().and_then(parse_date) {
            Some(date) => date,
            None => {
                if let Some(raw) = &item.date {
                    log::debug!("Unparseable date {raw:?} for {link}, using fallback");
                }
                self.fallback.date_for(link)
            }
        };

        let category = clean(item.category.as_deref())
            .unwrap_or_else(|| self.default_category.clone());
        let description = clean(item.description.as_deref()).unwrap_or_else(|| title.clone());

        Ok(Article {
            title,
            link: link.to_string(),
            date,
            category,
            description,
        })
    }

    /// Normalize a batch, logging and dropping rejects.
    ///
    /// Returns the accepted articles and the number rejected.
    pub fn normalize_all(&self, items: &[RawItem]) -> (Vec<Article>, usize) {
        let mut articles = Vec::with_capacity(items.len());
        let mut rejected = 0;
        for item in items {
            match self.normalize(item) {
                Ok(article) => articles.push(article),
                Err(reason) => {
                    rejected += 1;
                    log::warn!(
                        "Rejected item {:?} ({}): {}",
                        item.title.as_deref().unwrap_or("<untitled>"),
                        item.link.as_deref().unwrap_or("<no link>"),
                        reason
                    );
                }
            }
        }
        (articles, rejected)
    }

    /// Rebuild a cached article, repairing its date if needed.
    ///
    /// Cached titles were validated when first seen, so only the link is
    /// required here; a missing title falls back to the link.
    pub fn restore(&self, stored: StoredArticle) -> Option<Article> {
        let link = stored
            .link
            .as_deref()
            .map(str::trim)
            .filter(|l| is_http_url(l))?
            .to_string();
        let title = clean(stored.title.as_deref()).unwrap_or_else(|| link.clone());
        let date = stored
            .date
            .as_deref()
            .and_then(parse_date)
            .unwrap_or_else(|| self.fallback.date_for(&link));
        let category = clean(stored.category.as_deref())
            .unwrap_or_else(|| self.default_category.clone());
        let description = clean(stored.description.as_deref()).unwrap_or_else(|| title.clone());

        Some(Article {
            title,
            link,
            date,
            category,
            description,
        })
    }
}

fn clean(text: Option<&str>) -> Option<String> {
    text.map(normalize_whitespace).filter(|t| !t.is_empty())
}

/// Parse a date string in any of the supported formats.
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let text = normalize_whitespace(raw);
    if text.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(&text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(&text) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&text, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    let text = strip_ordinals(&text);
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(&text, format).ok())
        .map(|day| Utc.from_utc_datetime(&day.and_time(NaiveTime::MIN)))
}

/// "March 1st, 2024" -> "March 1, 2024"
fn strip_ordinals(text: &str) -> String {
    match Regex::new(r"\b(\d{1,2})(?:st|nd|rd|th)\b") {
        Ok(re) => re.replace_all(text, "$1").into_owned(),
        Err(_) => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn normalizer() -> ArticleNormalizer {
        ArticleNormalizer::new(&NormalizeConfig::default())
    }

    #[test]
    fn test_accepts_complete_item() {
        let item = RawItem::new("Incremental crawling", "https://example.com/posts/1")
            .with_date("2025-02-03")
            .with_category("Engineering")
            .with_description("  How  it works ");
        let article = normalizer().normalize(&item).unwrap();
        assert_eq!(article.title, "Incremental crawling");
        assert_eq!(article.category, "Engineering");
        assert_eq!(article.description, "How it works");
        assert_eq!(
            article.date,
            Utc.with_ymd_and_hms(2025, 2, 3, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_defaults_category_and_description() {
        let item = RawItem::new("Release notes", "https://example.com/r");
        let article = normalizer()
            .with_default_category("Blog")
            .normalize(&item)
            .unwrap();
        assert_eq!(article.category, "Blog");
        assert_eq!(article.description, "Release notes");
    }

    #[test]
    fn test_rejects_short_or_missing_title() {
        let n = normalizer();
        assert_eq!(
            n.normalize(&RawItem::new("Hi", "https://example.com/a")),
            Err(RejectReason::TitleTooShort { len: 2, min: 5 })
        );
        let untitled = RawItem {
            link: Some("https://example.com/a".to_string()),
            title: Some("   ".to_string()),
            ..RawItem::default()
        };
        assert_eq!(n.normalize(&untitled), Err(RejectReason::MissingTitle));
    }

    #[test]
    fn test_title_length_counts_graphemes() {
        let n = ArticleNormalizer::new(&NormalizeConfig {
            min_title_length: 3,
            ..NormalizeConfig::default()
        });
        assert!(n.normalize(&RawItem::new("공지사항", "https://example.com/k")).is_ok());
        assert!(n.normalize(&RawItem::new("é!", "https://example.com/e")).is_err());
    }

    #[test]
    fn test_rejects_relative_or_missing_link() {
        let n = normalizer();
        assert!(matches!(
            n.normalize(&RawItem::new("A proper title", "/news/relative")),
            Err(RejectReason::InvalidLink(_))
        ));
        assert!(matches!(
            n.normalize(&RawItem::new("A proper title", "ftp://example.com/x")),
            Err(RejectReason::InvalidLink(_))
        ));
        let no_link = RawItem {
            title: Some("A proper title".to_string()),
            ..RawItem::default()
        };
        assert_eq!(n.normalize(&no_link), Err(RejectReason::MissingLink));
    }

    #[test]
    fn test_unparseable_date_uses_stable_fallback() {
        let n = normalizer();
        let item = RawItem::new("Undated post", "https://example.com/undated").with_date("soon");
        let first = n.normalize(&item).unwrap();
        let second = n.normalize(&item).unwrap();
        assert_eq!(first.date, second.date);
        assert_eq!(first.date, n.fallback().date_for("https://example.com/undated"));
    }

    #[test]
    fn test_fallback_is_deterministic_and_in_range() {
        let fallback = FallbackDates::new(NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(), 730);
        let start = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
        let end = start + chrono::Duration::days(730);

        assert_eq!(
            fallback.date_for("https://example.com/a"),
            fallback.date_for("https://example.com/a")
        );

        let distinct: HashSet<_> = (0..200)
            .map(|i| fallback.date_for(&format!("https://example.com/post/{i}")))
            .inspect(|d| assert!(*d >= start && *d < end))
            .collect();
        assert!(distinct.len() > 100, "only {} distinct dates", distinct.len());
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        for raw in [
            "2024-03-01",
            "Mar 1, 2024",
            "March 1, 2024",
            "March 1st, 2024",
            "Mar 01 2024",
            "1 March 2024",
            "03/01/2024",
            "2024-03-01T00:00:00Z",
            "Fri, 01 Mar 2024 00:00:00 +0000",
            "  2024-03-01T00:00:00 ",
        ] {
            assert_eq!(parse_date(raw), Some(expected), "format: {raw:?}");
        }
        assert_eq!(
            parse_date("2024-03-01T09:00:00+09:00"),
            Some(expected),
            "offsets are converted to UTC"
        );
        assert_eq!(
            parse_date("2025-02-01T10:00:00.000"),
            Some(Utc.with_ymd_and_hms(2025, 2, 1, 10, 0, 0).unwrap()),
            "fractional seconds on naive timestamps"
        );
        assert_eq!(
            parse_date("2025-02-01 10:00:00.250"),
            Utc.with_ymd_and_hms(2025, 2, 1, 10, 0, 0)
                .single()
                .map(|d| d + chrono::Duration::milliseconds(250))
        );
        assert_eq!(parse_date("last Tuesday"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn test_restore_repairs_bad_dates() {
        let n = normalizer();
        let stored = StoredArticle {
            title: Some("Cached article".to_string()),
            link: Some("https://example.com/cached".to_string()),
            date: Some("not a date".to_string()),
            category: None,
            description: None,
        };
        let article = n.restore(stored).unwrap();
        assert_eq!(article.date, n.fallback().date_for("https://example.com/cached"));
        assert_eq!(article.category, "News");
        assert_eq!(article.description, "Cached article");

        assert!(n.restore(StoredArticle::default()).is_none());
    }
}
