//! Anonymous session assignment for view/click deduplication.

use rand::RngCore;
use rocket::http::{Cookie, CookieJar, SameSite};
use rocket::time::Duration as TimeDuration;

pub const TRACK_COOKIE_NAME: &str = "_track";
const SESSION_MAX_AGE_SECS: i64 = 30 * 24 * 60 * 60;

/// Reads the `_track` cookie, minting and setting a new one if absent.
///
/// The same cookie is re-applied to the response on every call so the
/// client's session is refreshed on each tracking request regardless of
/// whether it was just minted.
pub fn assign_session(cookies: &CookieJar<'_>, secure: bool) -> String {
    let session_id = match cookies.get(TRACK_COOKIE_NAME) {
        Some(existing) => existing.value().to_string(),
        None => mint_session_id(),
    };

    let cookie = Cookie::build((TRACK_COOKIE_NAME, session_id.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(TimeDuration::seconds(SESSION_MAX_AGE_SECS))
        .build();

    cookies.add(cookie);
    session_id
}

fn mint_session_id() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mints_a_32_char_hex_id() {
        let id = mint_session_id();
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn ids_are_not_trivially_repeated() {
        assert_ne!(mint_session_id(), mint_session_id());
    }
}
