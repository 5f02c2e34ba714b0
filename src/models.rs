//! Data models for arXiv papers and their translated representations.
//!
//! This module defines the two core data structures used throughout the
//! application:
//! - [`FeedItem`]: A paper announcement as decoded from an arXiv RSS feed
//! - [`StoredRecord`]: A translated paper as persisted in the SQLite store
//!
//! A `FeedItem` becomes a `StoredRecord` once its title and abstract have
//! been translated (or carried over verbatim when translation degrades).

/// A single paper announcement decoded from an arXiv RSS feed.
///
/// This struct represents the untranslated paper before it is sent to the
/// LLM. The `id` is the arXiv identifier (e.g. `2508.01234v1`) extracted
/// from the item's GUID and is used only for logging; deduplication keys
/// on the exact `title`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedItem {
    /// The arXiv identifier, e.g. `2508.01234v1`.
    pub id: String,
    /// The paper title, whitespace-trimmed, otherwise verbatim from the feed.
    pub title: String,
    /// The paper abstract as published in the feed.
    pub summary: String,
    /// The canonical abstract-page URL.
    pub link: String,
}

/// A translated paper as persisted in (and read back from) the store.
///
/// `title` is the original English title and acts as the primary key.
/// When translation fails end-to-end, `translated_title` and
/// `translated_summary` hold the original English text instead, so a
/// digest can always be rendered from whatever the store holds.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct StoredRecord {
    /// The original paper title; the deduplication key.
    pub title: String,
    /// The Chinese title, or the original title when translation degraded.
    pub translated_title: String,
    /// The Chinese abstract, or the original abstract when translation degraded.
    pub translated_summary: String,
    /// The abstract-page URL carried over from the feed.
    pub link: String,
    /// The local run date in `YYYY-MM-DD` format.
    pub date: String,
    /// The feed category, e.g. `cs.CV`.
    pub category: String,
}

impl StoredRecord {
    /// Build a record from a feed item and its translated title/abstract.
    pub fn translated(item: &FeedItem, title: String, summary: String, date: &str, category: &str) -> Self {
        StoredRecord {
            title: item.title.clone(),
            translated_title: title,
            translated_summary: summary,
            link: item.link.clone(),
            date: date.to_string(),
            category: category.to_string(),
        }
    }

    /// Build a record that keeps the item's original English text.
    pub fn untranslated(item: &FeedItem, date: &str, category: &str) -> Self {
        StoredRecord::translated(item, item.title.clone(), item.summary.clone(), date, category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item() -> FeedItem {
        FeedItem {
            id: "2508.01234v1".to_string(),
            title: "Attention Is Not Enough".to_string(),
            summary: "We revisit attention.".to_string(),
            link: "https://arxiv.org/abs/2508.01234".to_string(),
        }
    }

    #[test]
    fn test_translated_record_carries_feed_fields() {
        let record = StoredRecord::translated(
            &item(),
            "注意力并不足够".to_string(),
            "我们重新审视注意力机制。".to_string(),
            "2025-08-25",
            "cs.CV",
        );

        assert_eq!(record.title, "Attention Is Not Enough");
        assert_eq!(record.translated_title, "注意力并不足够");
        assert_eq!(record.link, "https://arxiv.org/abs/2508.01234");
        assert_eq!(record.date, "2025-08-25");
        assert_eq!(record.category, "cs.CV");
    }

    #[test]
    fn test_untranslated_record_keeps_original_text() {
        let record = StoredRecord::untranslated(&item(), "2025-08-25", "cs.CV");

        assert_eq!(record.translated_title, "Attention Is Not Enough");
        assert_eq!(record.translated_summary, "We revisit attention.");
    }
}
