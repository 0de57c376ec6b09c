//! `__session` cookie helpers.

use axum::http::{
    HeaderMap, HeaderValue,
    header::{COOKIE, InvalidHeaderValue},
};

use super::state::AuthConfig;

pub(crate) const SESSION_COOKIE_NAME: &str = "__session";

/// Build the `HttpOnly` session cookie carrying `token`.
pub(crate) fn session_cookie(
    config: &AuthConfig,
    token: &str,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let ttl_seconds = config.session_ttl_seconds();
    let cookie = with_policy(
        config,
        format!("{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={ttl_seconds}"),
    );
    HeaderValue::from_str(&cookie)
}

/// Expire the session cookie; path and domain must match the issuing cookie.
pub(crate) fn clear_session_cookie(config: &AuthConfig) -> Result<HeaderValue, InvalidHeaderValue> {
    let cookie = with_policy(
        config,
        format!("{SESSION_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0"),
    );
    HeaderValue::from_str(&cookie)
}

fn with_policy(config: &AuthConfig, mut cookie: String) -> String {
    if let Some(domain) = config.session_cookie_domain() {
        cookie.push_str("; Domain=");
        cookie.push_str(domain);
    }
    if config.session_cookie_secure() {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Read the session cookie. Empty values count as absent.
pub(crate) fn extract_session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|header| header.to_str().ok())
        .flat_map(|value| value.split(';'))
        .find_map(|pair| {
            let (key, val) = pair.trim().split_once('=')?;
            let val = val.trim();
            (key.trim() == SESSION_COOKIE_NAME && !val.is_empty()).then(|| val.to_string())
        })
}
