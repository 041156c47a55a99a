//! Derives the outbound base URL used by the link rewriter and redirects.

use rocket::Request;

/// `<scheme>://<host>` for the current request. `https` iff the connection
/// terminated TLS at this process or a trusted proxy says so via
/// `X-Forwarded-Proto` (the real-IP fairing has already stripped that header
/// from untrusted peers).
pub fn base_url(request: &Request<'_>) -> String {
    let scheme = if is_https(request) { "https" } else { "http" };
    let host = request
        .headers()
        .get_one("Host")
        .unwrap_or("localhost")
        .to_string();
    format!("{scheme}://{host}")
}

fn is_https(request: &Request<'_>) -> bool {
    request
        .headers()
        .get_one("X-Forwarded-Proto")
        .map(|v| v.eq_ignore_ascii_case("https"))
        .unwrap_or(false)
}
