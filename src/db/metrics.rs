//! Time-series view/click tracking against the optional metrics database.

use super::Store;

impl Store {
    /// `count(distinct session_id)` over all view events for an email.
    /// Zero when no metrics pool is configured or the read fails.
    pub async fn metrics_view_count(&self, email_id: &str) -> Result<i64, sqlx::Error> {
        let Some(pool) = &self.metrics_pool else {
            return Ok(0);
        };

        let row = sqlx::query_scalar::<_, i64>(
            "SELECT count(DISTINCT session_id) FROM email_views WHERE email_id = $1",
        )
        .bind(email_id)
        .fetch_one(pool)
        .await;

        Ok(match row {
            Ok(count) => count,
            Err(err) => {
                log::warn!("metrics view count degraded to zero for {email_id}: {err}");
                0
            }
        })
    }

    /// `count(distinct (session_id, link_index))` over click events for an email.
    pub async fn metrics_click_count(&self, email_id: &str) -> Result<i64, sqlx::Error> {
        let Some(pool) = &self.metrics_pool else {
            return Ok(0);
        };

        let row = sqlx::query_scalar::<_, i64>(
            "SELECT count(DISTINCT (session_id, link_index)) FROM email_link_clicks WHERE email_id = $1",
        )
        .bind(email_id)
        .fetch_one(pool)
        .await;

        Ok(match row {
            Ok(count) => count,
            Err(err) => {
                log::warn!("metrics click count degraded to zero for {email_id}: {err}");
                0
            }
        })
    }

    /// Records a view if no matching event exists in the last 5 minutes.
    /// A no-op (logged, swallowed) when no metrics pool is configured or the
    /// write fails — callers treat this as best-effort.
    pub async fn record_view(&self, email_id: &str, session_id: &str) {
        let Some(pool) = &self.metrics_pool else {
            return;
        };

        let result = sqlx::query(
            r#"
            INSERT INTO email_views (time, session_id, email_id)
            SELECT now(), $1, $2
            WHERE NOT EXISTS (
                SELECT 1 FROM email_views
                WHERE session_id = $1 AND email_id = $2 AND time > now() - interval '5 minutes'
            )
            "#,
        )
        .bind(session_id)
        .bind(email_id)
        .execute(pool)
        .await;

        if let Err(err) = result {
            log::warn!("failed to record view for {email_id}: {err}");
        }
    }

    /// Records a click if no matching (session, email, link_index) event
    /// exists in the last 5 minutes. Best-effort, same as [`record_view`].
    pub async fn record_click(
        &self,
        email_id: &str,
        session_id: &str,
        link_index: i32,
        link_url: &str,
    ) {
        let Some(pool) = &self.metrics_pool else {
            return;
        };

        let result = sqlx::query(
            r#"
            INSERT INTO email_link_clicks (time, session_id, email_id, link_url, link_index)
            SELECT now(), $1, $2, $3, $4
            WHERE NOT EXISTS (
                SELECT 1 FROM email_link_clicks
                WHERE session_id = $1 AND email_id = $2 AND link_index = $4
                  AND time > now() - interval '5 minutes'
            )
            "#,
        )
        .bind(session_id)
        .bind(email_id)
        .bind(link_url)
        .bind(link_index)
        .execute(pool)
        .await;

        if let Err(err) = result {
            log::warn!("failed to record click for {email_id}: {err}");
        }
    }
}
