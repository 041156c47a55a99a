//! Warehouse-backed queries against the content database.

use super::Store;
use crate::models::{Email, EmailStats, ListRef, MailingList, Paginated, DEFAULT_COLOR};
use crate::slug::slug;
use chrono::{DateTime, Utc};
use sqlx::Row;

struct MailingListRow {
    id: i32,
    friendly_name: String,
    description: Option<String>,
    is_public: bool,
    color_scheme: Option<String>,
    last_updated_at: Option<DateTime<Utc>>,
    last_sent_at: Option<DateTime<Utc>>,
    sent_email_count: i64,
    subscriber_count: i64,
}

struct CampaignRow {
    id: i32,
    title: Option<String>,
    ai_publishable_slug: Option<String>,
    sent_at: Option<DateTime<Utc>>,
    opens: i64,
    clicks: i64,
    html: Option<String>,
    markdown: Option<String>,
    excerpt: Option<String>,
    mailing_list_id: i32,
    mailing_list_slug: String,
    mailing_list_name: String,
    mailing_list_description: Option<String>,
    mailing_list_color: Option<String>,
}

impl Store {
    /// Warehouse `(opens, clicks)` for a single campaign, looked up by id.
    /// Zero for either column when the campaign doesn't exist or the id
    /// isn't numeric — callers add this to the live metrics count.
    pub async fn warehouse_stats(&self, email_id: &str) -> Result<(i64, i64), sqlx::Error> {
        let Ok(id) = email_id.parse::<i32>() else {
            return Ok((0, 0));
        };

        let row = sqlx::query("SELECT opens, clicks FROM loops.campaigns WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.content_pool)
            .await?;

        Ok(match row {
            Some(row) => (row.get("opens"), row.get("clicks")),
            None => (0, 0),
        })
    }

    /// Lists mailing lists that have at least one eligible sent campaign,
    /// ordered ever-sent-first, then by `last_sent_at` descending (nulls
    /// last), then by name ascending.
    pub async fn list_mailing_lists(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<Paginated<MailingList>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT
                ml.id,
                ml.friendly_name,
                ml.description,
                ml.is_public,
                ml.color_scheme,
                ml.last_updated_at,
                sent.sent_email_count,
                sent.last_sent_at,
                COALESCE(sub.subscriber_count, 0) AS subscriber_count
            FROM loops.mailing_lists ml
            JOIN (
                SELECT
                    c.mailing_list_id,
                    count(*) AS sent_email_count,
                    max(c.sent_at) AS last_sent_at
                FROM loops.campaigns c
                WHERE c.status = 'Sent'
                  AND c.mailing_list_id IS NOT NULL
                  AND c.ai_publishable
                GROUP BY c.mailing_list_id
            ) sent ON sent.mailing_list_id = ml.id
            LEFT JOIN (
                SELECT mailing_list_id, count(*) AS subscriber_count
                FROM loops.audience_mailing_lists
                GROUP BY mailing_list_id
            ) sub ON sub.mailing_list_id = ml.id
            ORDER BY sent.last_sent_at DESC NULLS LAST, ml.friendly_name ASC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.content_pool)
        .await?;

        let items = rows
            .into_iter()
            .map(|row| {
                let r = MailingListRow {
                    id: row.get("id"),
                    friendly_name: row.get("friendly_name"),
                    description: row.get("description"),
                    is_public: row.get("is_public"),
                    color_scheme: row.get("color_scheme"),
                    last_updated_at: row.get("last_updated_at"),
                    last_sent_at: row.get("last_sent_at"),
                    sent_email_count: row.get("sent_email_count"),
                    subscriber_count: row.get("subscriber_count"),
                };
                to_mailing_list(r)
            })
            .collect();

        Ok(Paginated::new(items, offset, limit))
    }

    /// Lists eligible sent campaigns, optionally scoped to a single mailing
    /// list, ordered `sent_at` descending (nulls last) then `created_at` descending.
    pub async fn list_emails(
        &self,
        limit: i64,
        offset: i64,
        mailing_list_id: Option<i32>,
        base_url: &str,
    ) -> Result<Paginated<Email>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT
                c.id,
                COALESCE(c.ai_publishable_response_json->>'title', NULL) AS title,
                c.ai_publishable_slug,
                c.sent_at,
                c.opens,
                c.clicks,
                c.ai_publishable_content_html AS html,
                c.ai_publishable_content_markdown AS markdown,
                c.ai_publishable_response_json->>'excerpt' AS excerpt,
                ml.id AS mailing_list_id,
                ml.friendly_name AS mailing_list_name,
                ml.description AS mailing_list_description,
                ml.color_scheme AS mailing_list_color
            FROM loops.campaigns c
            JOIN loops.mailing_lists ml ON ml.id = c.mailing_list_id
            WHERE c.status = 'Sent'
              AND c.mailing_list_id IS NOT NULL
              AND c.ai_publishable
              AND ($3::int IS NULL OR c.mailing_list_id = $3)
            ORDER BY c.sent_at DESC NULLS LAST, c.created_at DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .bind(mailing_list_id)
        .fetch_all(&self.content_pool)
        .await?;

        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            let mailing_list_name: String = row.get("mailing_list_name");
            let r = CampaignRow {
                id: row.get("id"),
                title: row.get("title"),
                ai_publishable_slug: row.get("ai_publishable_slug"),
                sent_at: row.get("sent_at"),
                opens: row.get("opens"),
                clicks: row.get("clicks"),
                html: row.get("html"),
                markdown: row.get("markdown"),
                excerpt: row.get("excerpt"),
                mailing_list_id: row.get("mailing_list_id"),
                mailing_list_slug: slug(&mailing_list_name),
                mailing_list_name,
                mailing_list_description: row.get("mailing_list_description"),
                mailing_list_color: row.get("mailing_list_color"),
            };
            items.push(self.campaign_row_to_email(r, base_url).await?);
        }

        Ok(Paginated::new(items, offset, limit))
    }

    async fn campaign_row_to_email(
        &self,
        row: CampaignRow,
        base_url: &str,
    ) -> Result<Email, sqlx::Error> {
        let email_id = row.id.to_string();

        let email_slug = row
            .ai_publishable_slug
            .filter(|s| !s.trim().is_empty())
            .or_else(|| row.title.clone())
            .map(|s| slug(&s))
            .unwrap_or_else(|| slug(&email_id));

        let html = row.html.map(|html| {
            crate::link_rewriter::rewrite_links(&html, base_url, &email_id)
        });

        let preview_text = derive_preview_text(row.markdown.as_deref(), html.as_deref());

        let view_count = self.metrics_view_count(&email_id).await?;
        let click_count = self.metrics_click_count(&email_id).await?;

        Ok(Email {
            id: email_id,
            slug: email_slug,
            subject: row.title.unwrap_or_default(),
            excerpt: row.excerpt,
            sent_at: row.sent_at,
            mailing_list_id: row.mailing_list_id.to_string(),
            mailing_list: ListRef {
                id: row.mailing_list_id.to_string(),
                slug: row.mailing_list_slug,
                name: row.mailing_list_name,
                description: row.mailing_list_description,
                color: row.mailing_list_color.unwrap_or_else(|| DEFAULT_COLOR.to_string()),
            },
            stats: EmailStats {
                views: row.opens + view_count,
                clicks: row.clicks + click_count,
            },
            html,
            markdown: row.markdown,
            preview_text,
        })
    }
}

fn to_mailing_list(row: MailingListRow) -> MailingList {
    MailingList {
        id: row.id.to_string(),
        slug: slug(&row.friendly_name),
        name: row.friendly_name,
        description: row.description,
        color: row.color_scheme.unwrap_or_else(|| DEFAULT_COLOR.to_string()),
        is_public: row.is_public,
        subscriber_count: row.subscriber_count,
        last_updated_at: row.last_updated_at,
        last_sent_at: row.last_sent_at,
        sent_email_count: row.sent_email_count,
    }
}

/// First 200 characters of trimmed markdown if present, otherwise of HTML
/// with scripts/styles dropped, tags elided, and whitespace collapsed.
fn derive_preview_text(markdown: Option<&str>, html: Option<&str>) -> Option<String> {
    if let Some(markdown) = markdown {
        let trimmed = markdown.trim();
        if !trimmed.is_empty() {
            return Some(truncate_chars(trimmed, 200));
        }
    }

    let html = html?;
    let stripped = strip_html(html);
    let trimmed = stripped.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(truncate_chars(trimmed, 200))
    }
}

fn strip_html(html: &str) -> String {
    use regex::Regex;
    use std::sync::OnceLock;

    static SCRIPT_STYLE: OnceLock<Regex> = OnceLock::new();
    static TAG: OnceLock<Regex> = OnceLock::new();
    static WHITESPACE: OnceLock<Regex> = OnceLock::new();

    let script_style = SCRIPT_STYLE.get_or_init(|| {
        Regex::new(r"(?is)<(script|style)\b[^<]*(?:(?!</\1>)<[^<]*)*</\1>").unwrap()
    });
    let tag = TAG.get_or_init(|| Regex::new(r"(?s)<[^>]*>").unwrap());
    let whitespace = WHITESPACE.get_or_init(|| Regex::new(r"\s+").unwrap());

    let no_script = script_style.replace_all(html, " ");
    let no_tags = tag.replace_all(&no_script, " ");
    whitespace.replace_all(&no_tags, " ").trim().to_string()
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
