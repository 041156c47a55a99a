//! Shared cache-aware JSON response wrapper for read endpoints.

use crate::cache::ResponseCache;
use crate::error::ApiError;
use rocket::http::{ContentType, Status};
use rocket::response::{self, Responder};
use rocket::{Request, Response};
use serde::Serialize;
use std::future::Future;
use std::io::Cursor;

pub enum CachedJson {
    NotModified,
    Body { bytes: Vec<u8>, etag: String },
}

impl<'r> Responder<'r, 'static> for CachedJson {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'static> {
        match self {
            CachedJson::NotModified => Response::build().status(Status::NotModified).ok(),
            CachedJson::Body { bytes, etag } => Response::build()
                .status(Status::Ok)
                .header(ContentType::new("application", "json").with_params(("charset", "utf-8")))
                .raw_header("Cache-Control", "public, max-age=30, stale-while-revalidate=60")
                .raw_header("ETag", etag)
                .sized_body(bytes.len(), Cursor::new(bytes))
                .ok(),
        }
    }
}

/// Builds the cache key, serves from cache on hit (honoring `If-None-Match`),
/// otherwise invokes `build`, marshals indented JSON, installs the cache
/// entry, and returns the response.
pub async fn json_cached<T, F, Fut>(
    cache: &ResponseCache,
    key: String,
    if_none_match: Option<&str>,
    build: F,
) -> Result<CachedJson, ApiError>
where
    T: Serialize,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    if let Some(hit) = cache.get(&key) {
        if if_none_match == Some(hit.etag.as_ref()) {
            return Ok(CachedJson::NotModified);
        }
        return Ok(CachedJson::Body {
            bytes: (*hit.body).clone(),
            etag: hit.etag.to_string(),
        });
    }

    let value = build().await?;
    let bytes = serde_json::to_vec_pretty(&value)
        .map_err(|err| ApiError::Internal(err.to_string()))?;
    let etag = cache.set(key, bytes.clone()).to_string();

    if if_none_match == Some(etag.as_str()) {
        return Ok(CachedJson::NotModified);
    }

    Ok(CachedJson::Body { bytes, etag })
}
