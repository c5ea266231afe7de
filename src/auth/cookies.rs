use axum::http::{header, HeaderMap, HeaderValue};
use std::time::Duration;

use crate::auth::jwt::JwtKeys;

pub const ACCESS_COOKIE: &str = "accessToken";
pub const REFRESH_COOKIE: &str = "refreshToken";

/// Serialize an http-only auth cookie scoped to the whole site. Tokens are
/// base64url JWT text, so the value is always a valid header.
fn auth_cookie(name: &str, value: &str, max_age: Duration) -> HeaderValue {
    format!(
        "{}={}; Path=/; Max-Age={}; HttpOnly; Secure; SameSite=Strict",
        name,
        value,
        max_age.as_secs()
    )
    .parse()
    .expect("cookie value is valid ascii")
}

/// Max-Age=0 drops the cookie immediately.
fn expired_cookie(name: &str) -> HeaderValue {
    format!("{}=; Path=/; Max-Age=0; HttpOnly; Secure; SameSite=Strict", name)
        .parse()
        .expect("cookie value is valid ascii")
}

/// Set-Cookie headers carrying a fresh token pair, each capped at its
/// class's ttl.
pub fn set_auth_cookies(keys: &JwtKeys, access_token: &str, refresh_token: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.append(
        header::SET_COOKIE,
        auth_cookie(ACCESS_COOKIE, access_token, keys.access_ttl),
    );
    headers.append(
        header::SET_COOKIE,
        auth_cookie(REFRESH_COOKIE, refresh_token, keys.refresh_ttl),
    );
    headers
}

/// Set-Cookie headers that drop both auth cookies.
pub fn clear_auth_cookies() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.append(header::SET_COOKIE, expired_cookie(ACCESS_COOKIE));
    headers.append(header::SET_COOKIE, expired_cookie(REFRESH_COOKIE));
    headers
}

/// Value of a named cookie from the request's Cookie header, if present
/// and non-empty.
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    let prefix = format!("{}=", name);
    for cookie in cookies.split(';') {
        if let Some(value) = cookie.trim().strip_prefix(&prefix) {
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }
    None
}
