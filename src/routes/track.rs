//! View recording, click tracking/redirect, and the live stats stream.

use crate::db::Store;
use crate::error::ApiError;
use crate::middleware::ClientIp;
use crate::notifier::ViewNotifier;
use crate::rate_limit::{ClickRateLimiter, StreamRateLimited};
use crate::session::assign_session;
use rocket::http::CookieJar;
use rocket::response::Redirect;
use rocket::response::stream::{Event, EventStream};
use rocket::serde::json::Json;
use rocket::{Request, State};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;

const STREAM_THROTTLE: Duration = Duration::from_millis(333);

#[derive(Serialize)]
pub struct ViewCount {
    views: i64,
}

#[derive(Serialize)]
struct StatsSnapshot {
    views: i64,
    clicks: i64,
}

fn is_https(request: &Request<'_>) -> bool {
    request
        .headers()
        .get_one("X-Forwarded-Proto")
        .map(|v| v.eq_ignore_ascii_case("https"))
        .unwrap_or(false)
}

#[get("/emails/<id>/view")]
pub async fn record_view(
    request: &Request<'_>,
    id: &str,
    cookies: &CookieJar<'_>,
    store: &State<Store>,
    notifier: &State<ViewNotifier>,
) -> Result<Json<ViewCount>, ApiError> {
    if id.trim().is_empty() {
        return Err(ApiError::BadRequest("missing email id".to_string()));
    }

    let session_id = assign_session(cookies, is_https(request));
    store.record_view(id, &session_id).await;
    notifier.notify(id);

    let (warehouse_opens, _) = store.warehouse_stats(id).await.unwrap_or((0, 0));
    let views = warehouse_opens + store.metrics_view_count(id).await.unwrap_or(0);

    Ok(Json(ViewCount { views }))
}

#[get("/emails/<id>/click/<index>?<url>")]
pub async fn record_click(
    request: &Request<'_>,
    id: &str,
    index: Option<i32>,
    url: Option<&str>,
    cookies: &CookieJar<'_>,
    client_ip: ClientIp,
    store: &State<Store>,
    notifier: &State<ViewNotifier>,
    limiter: &State<Arc<ClickRateLimiter>>,
) -> Result<Redirect, ApiError> {
    if id.trim().is_empty() {
        return Err(ApiError::BadRequest("missing email id".to_string()));
    }
    let Some(index) = index else {
        return Err(ApiError::BadRequest("missing or malformed link index".to_string()));
    };
    let Some(url) = url.filter(|u| !u.is_empty()) else {
        return Err(ApiError::BadRequest("missing url".to_string()));
    };

    let session_id = assign_session(cookies, is_https(request));

    if limiter.should_record(client_ip.0) {
        store.record_click(id, &session_id, index, url).await;
        notifier.notify(id);
    }

    Ok(Redirect::to(url.to_string()))
}

#[get("/emails/<id>/stats/stream")]
pub fn stats_stream(
    id: &str,
    store: &State<Store>,
    notifier: &State<ViewNotifier>,
    _rate_limit: StreamRateLimited,
) -> EventStream![] {
    let id = id.to_string();
    let store = store.inner().clone();
    let notifier = notifier.inner();
    let mut subscription = notifier.subscribe(&id);

    EventStream! {
        let snapshot = fetch_snapshot(&store, &subscription.email_id).await;
        yield Event::json(&snapshot);

        let mut ticker = interval(STREAM_THROTTLE);
        let mut pending = false;

        loop {
            tokio::select! {
                received = subscription.receiver.recv() => {
                    match received {
                        Some(()) => pending = true,
                        None => break,
                    }
                }
                _ = ticker.tick() => {
                    if pending {
                        pending = false;
                        let snapshot = fetch_snapshot(&store, &subscription.email_id).await;
                        yield Event::json(&snapshot);
                    }
                }
            }
        }

        notifier.unsubscribe(&subscription.email_id, subscription.id);
    }
}

async fn fetch_snapshot(store: &Store, email_id: &str) -> StatsSnapshot {
    let (warehouse_opens, warehouse_clicks) =
        store.warehouse_stats(email_id).await.unwrap_or_else(|err| {
            log::error!("stream snapshot warehouse read failed for {email_id}: {err}");
            (0, 0)
        });
    let views = warehouse_opens
        + store.metrics_view_count(email_id).await.unwrap_or_else(|err| {
            log::error!("stream snapshot view read failed for {email_id}: {err}");
            0
        });
    let clicks = warehouse_clicks
        + store.metrics_click_count(email_id).await.unwrap_or_else(|err| {
            log::error!("stream snapshot click read failed for {email_id}: {err}");
            0
        });
    StatsSnapshot { views, clicks }
}
