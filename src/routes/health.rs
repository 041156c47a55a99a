//! Liveness endpoint, short-circuited ahead of rate limiting and CORS.

#[get("/healthz")]
pub fn healthz() -> &'static str {
    "ok"
}
