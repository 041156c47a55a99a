//! Domain types returned by the public read endpoints.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Compact projection of a [`MailingList`] embedded inside each [`Email`].
#[derive(Debug, Clone, Serialize)]
pub struct ListRef {
    /// Database identifier.
    pub id: String,
    /// URL-safe slug derived from `name`.
    pub slug: String,
    /// Human-friendly display name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Hex color, defaults to [`DEFAULT_COLOR`].
    pub color: String,
}

/// A mailing list that has sent at least one publishable campaign.
#[derive(Debug, Clone, Serialize)]
pub struct MailingList {
    pub id: String,
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub color: String,
    pub is_public: bool,
    /// Aggregate subscriber count from the content warehouse.
    pub subscriber_count: i64,
    pub last_updated_at: Option<DateTime<Utc>>,
    pub last_sent_at: Option<DateTime<Utc>>,
    /// Count of eligible sent campaigns for this list.
    pub sent_email_count: i64,
}

/// View/click counters, each the sum of a warehouse aggregate and a live
/// metrics aggregate.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct EmailStats {
    pub views: i64,
    pub clicks: i64,
}

/// A sent, publishable campaign.
#[derive(Debug, Clone, Serialize)]
pub struct Email {
    pub id: String,
    /// From `ai_publishable_slug`, falling back to `subject` then `id`.
    pub slug: String,
    pub subject: String,
    pub excerpt: Option<String>,
    pub sent_at: Option<DateTime<Utc>>,
    pub mailing_list_id: String,
    pub mailing_list: ListRef,
    pub stats: EmailStats,
    /// Publishable HTML with outbound links rewritten through the click tracker.
    pub html: Option<String>,
    pub markdown: Option<String>,
    /// First 200 characters of the markdown, or of stripped HTML if markdown is absent.
    pub preview_text: Option<String>,
}

/// A page of results, with `next_offset` present iff the page was fully populated.
#[derive(Debug, Clone, Serialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub next_offset: Option<i64>,
}

impl<T> Paginated<T> {
    pub fn new(items: Vec<T>, offset: i64, limit: i64) -> Self {
        let next_offset = if items.len() as i64 == limit {
            Some(offset + limit)
        } else {
            None
        };
        Self { items, next_offset }
    }
}

pub const DEFAULT_COLOR: &str = "#000000";

/// A mailing list paired with its most recent eligible emails.
/// Lists with zero matching emails are omitted by the caller.
#[derive(Debug, Clone, Serialize)]
pub struct GroupedEmails {
    pub list: MailingList,
    pub emails: Vec<Email>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_offset_present_when_page_is_full() {
        let page = Paginated::new(vec![1, 2, 3], 0, 3);
        assert_eq!(page.next_offset, Some(3));
    }

    #[test]
    fn next_offset_absent_when_page_is_short() {
        let page = Paginated::new(vec![1, 2], 0, 3);
        assert_eq!(page.next_offset, None);
    }

    #[test]
    fn next_offset_accounts_for_prior_offset() {
        let page = Paginated::new(vec![1, 2, 3], 30, 3);
        assert_eq!(page.next_offset, Some(33));
    }

    #[test]
    fn empty_page_has_no_next_offset_unless_limit_is_zero() {
        let page: Paginated<i32> = Paginated::new(vec![], 0, 3);
        assert_eq!(page.next_offset, None);

        let zero_limit: Paginated<i32> = Paginated::new(vec![], 10, 0);
        assert_eq!(zero_limit.next_offset, Some(10));
    }
}
