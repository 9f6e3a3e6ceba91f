//! Newest-first feed ordering.

use chrono::{DateTime, Utc};

use crate::models::Article;

/// Order items newest-first by the date `key` returns.
///
/// The sort is stable, so equal dates keep their input order. Items without a
/// date go after every dated item, also in input order.
pub fn order_by<T, F>(items: Vec<T>, key: F) -> Vec<T>
where
    F: Fn(&T) -> Option<DateTime<Utc>>,
{
    let (mut dated, undated): (Vec<T>, Vec<T>) =
        items.into_iter().partition(|item| key(item).is_some());

    dated.sort_by(|a, b| key(b).cmp(&key(a)));
    dated.extend(undated);
    dated
}

/// Order articles for rendering, newest first.
pub fn order(articles: Vec<Article>) -> Vec<Article> {
    order_by(articles, |a| Some(a.date))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, d, 12, 0, 0).unwrap()
    }

    fn article(slug: &str, d: u32) -> Article {
        Article {
            title: format!("Post {slug}"),
            link: format!("https://example.com/{slug}"),
            date: day(d),
            category: "News".to_string(),
            description: String::new(),
        }
    }

    #[test]
    fn test_order_newest_first() {
        let ordered = order(vec![article("mid", 2), article("new", 3), article("old", 1)]);
        let slugs: Vec<&str> = ordered.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(slugs, vec!["Post new", "Post mid", "Post old"]);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let ordered = order(vec![article("first", 5), article("second", 5), article("newer", 6)]);
        let slugs: Vec<&str> = ordered.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(slugs, vec!["Post newer", "Post first", "Post second"]);
    }

    #[test]
    fn test_undated_items_go_last() {
        let items = vec![
            ("undated-a", None),
            ("old", Some(day(1))),
            ("undated-b", None),
            ("new", Some(day(9))),
        ];
        let ordered = order_by(items, |(_, date)| *date);
        let names: Vec<&str> = ordered.iter().map(|(name, _)| *name).collect();
        assert_eq!(names, vec!["new", "old", "undated-a", "undated-b"]);
    }

    #[test]
    fn test_order_empty() {
        assert!(order(Vec::new()).is_empty());
    }
}
