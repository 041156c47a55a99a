use chrono::Utc;
use rocket::http::Status;
use rocket::response::{self, Responder};
use rocket::{Request, Response};
use serde::Serialize;
use std::io::Cursor;

/// The taxonomy of failures the API surfaces to clients.
///
/// `NotFound` is reserved for the router itself; read endpoints return empty
/// pages rather than 404 when nothing matches a query.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Timeout,
    Internal(String),
}

/// RFC 7807-style problem details payload.
#[derive(Debug, Serialize)]
pub struct ProblemDetails {
    #[serde(rename = "type")]
    pub problem_type: String,
    pub title: String,
    pub status: u16,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
    pub timestamp: String,
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'static> {
        let (status, title, detail, problem_type) = match self {
            ApiError::BadRequest(msg) => {
                log::debug!("bad request: {msg}");
                (
                    Status::BadRequest,
                    "Bad Request",
                    msg,
                    "https://docs.loops-public-api/errors/bad-request",
                )
            }
            ApiError::NotFound(msg) => {
                log::debug!("not found: {msg}");
                (
                    Status::NotFound,
                    "Resource Not Found",
                    msg,
                    "https://docs.loops-public-api/errors/not-found",
                )
            }
            ApiError::Timeout => {
                log::warn!("upstream timeout");
                (
                    Status::GatewayTimeout,
                    "Upstream Timeout",
                    "upstream timeout".to_string(),
                    "https://docs.loops-public-api/errors/timeout",
                )
            }
            ApiError::Internal(cause) => {
                log::error!("internal error: {cause}");
                (
                    Status::InternalServerError,
                    "Internal Server Error",
                    "internal server error".to_string(),
                    "https://docs.loops-public-api/errors/internal",
                )
            }
        };

        let body = ProblemDetails {
            problem_type: problem_type.to_string(),
            title: title.to_string(),
            status: status.code,
            detail,
            instance: None,
            timestamp: Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        };

        let json = serde_json::to_string(&body).unwrap_or_else(|_| {
            r#"{"type":"about:blank","title":"Internal Server Error","status":500,"detail":"failed to serialize error"}"#
                .to_string()
        });

        Response::build()
            .status(status)
            .header(rocket::http::ContentType::JSON)
            .sized_body(json.len(), Cursor::new(json))
            .ok()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound("resource not found".to_string()),
            sqlx::Error::PoolTimedOut => ApiError::Timeout,
            other => {
                log::error!("database error: {other}");
                ApiError::Internal(other.to_string())
            }
        }
    }
}

impl From<crate::config::ConfigError> for ApiError {
    fn from(err: crate::config::ConfigError) -> Self {
        ApiError::Internal(err.to_string())
    }
}
