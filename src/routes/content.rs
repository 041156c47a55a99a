//! Read endpoints: mailing lists, emails, and grouped emails per list.

use super::json_cache::{json_cached, CachedJson};
use crate::base_url::base_url;
use crate::cache::ResponseCache;
use crate::db::Store;
use crate::error::ApiError;
use crate::models::{Email, GroupedEmails, MailingList, Paginated};
use crate::rate_limit::ReadRateLimited;
use rocket::request::{FromRequest, Outcome};
use rocket::{Request, State};

const MAX_GROUPED_LISTS: i64 = 1000;

/// Carries the incoming `If-None-Match` header, if any.
pub struct IfNoneMatch(pub Option<String>);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for IfNoneMatch {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        Outcome::Success(IfNoneMatch(
            request.headers().get_one("If-None-Match").map(str::to_string),
        ))
    }
}

fn clamp_limit(limit: Option<i64>, default: i64, max: i64) -> i64 {
    limit.map(|l| l.clamp(1, max)).unwrap_or(default)
}

#[get("/mailing_lists?<limit>&<offset>")]
pub async fn list_mailing_lists(
    limit: Option<i64>,
    offset: Option<i64>,
    store: &State<Store>,
    cache: &State<ResponseCache>,
    if_none_match: IfNoneMatch,
    _rate_limit: ReadRateLimited,
) -> Result<CachedJson, ApiError> {
    let limit = clamp_limit(limit, 50, 200);
    let offset = offset.unwrap_or(0).max(0);
    let key = format!("mailing_lists?limit={limit}&offset={offset}");

    json_cached::<Paginated<MailingList>, _, _>(
        cache,
        key,
        if_none_match.0.as_deref(),
        || async { Ok(store.list_mailing_lists(limit, offset).await?) },
    )
    .await
}

#[get("/emails?<limit>&<offset>&<mailing_list_id>")]
pub async fn list_emails(
    request: &Request<'_>,
    limit: Option<i64>,
    offset: Option<i64>,
    mailing_list_id: Option<i32>,
    store: &State<Store>,
    cache: &State<ResponseCache>,
    if_none_match: IfNoneMatch,
    _rate_limit: ReadRateLimited,
) -> Result<CachedJson, ApiError> {
    let limit = clamp_limit(limit, 50, 200);
    let offset = offset.unwrap_or(0).max(0);
    let base = base_url(request);
    let key = format!(
        "emails?limit={limit}&offset={offset}&mailing_list_id={}",
        mailing_list_id.map(|v| v.to_string()).unwrap_or_default()
    );

    json_cached::<Paginated<Email>, _, _>(
        cache,
        key,
        if_none_match.0.as_deref(),
        || async { Ok(store.list_emails(limit, offset, mailing_list_id, &base).await?) },
    )
    .await
}

#[get("/mailing_lists/emails?<group_all>&<limit_per_list>")]
pub async fn grouped_emails(
    request: &Request<'_>,
    group_all: Option<bool>,
    limit_per_list: Option<i64>,
    store: &State<Store>,
    cache: &State<ResponseCache>,
    if_none_match: IfNoneMatch,
    _rate_limit: ReadRateLimited,
) -> Result<CachedJson, ApiError> {
    let group_all = group_all.unwrap_or(false);
    let limit_per_list = clamp_limit(limit_per_list, 1, 50);
    let base = base_url(request);
    let key = format!("mailing_lists/emails?group_all={group_all}&limit_per_list={limit_per_list}");

    json_cached::<Vec<GroupedEmails>, _, _>(
        cache,
        key,
        if_none_match.0.as_deref(),
        || async {
            let lists = store.list_mailing_lists(MAX_GROUPED_LISTS, 0).await?.items;
            let mut grouped = Vec::with_capacity(lists.len());

            for list in lists {
                let list_id: i32 = list
                    .id
                    .parse()
                    .map_err(|_| ApiError::Internal("non-numeric mailing list id".to_string()))?;

                let cap = if group_all { limit_per_list } else { 1 };
                let emails = store
                    .list_emails(cap, 0, Some(list_id), &base)
                    .await?
                    .items;

                if emails.is_empty() {
                    continue;
                }

                let emails = if group_all { emails } else { vec![emails.into_iter().next().unwrap()] };
                grouped.push(GroupedEmails { list, emails });
            }

            Ok(grouped)
        },
    )
    .await
}
