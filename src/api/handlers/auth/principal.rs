//! Authoritative page guard.
//!
//! Flow Overview: read the session cookie, verify the artifact locally
//! (signature, issuer, expiry), then consult the revocation table. Every
//! dashboard handler calls [`require_session`] before touching data.
//!
//! All failures collapse into the same response (clear the cookie and go to
//! `/login`); the cause is only logged.

use axum::{
    http::{HeaderMap, header::SET_COOKIE},
    response::{IntoResponse, Redirect, Response},
};
use serde_json::{Map, Value};
use sqlx::PgPool;
use tracing::{error, warn};

use super::{
    cookie::{clear_session_cookie, extract_session_cookie},
    guard::LOGIN_PATH,
    state::AuthState,
    storage::is_session_revoked,
};

/// Authenticated admin derived from a verified session artifact.
#[derive(Clone, Debug)]
pub struct Principal {
    pub uid: String,
    pub phone_number: Option<String>,
    pub claims: Map<String, Value>,
}

/// Verify the session cookie or produce the redirect to `/login`.
///
/// # Errors
/// Returns the ready-made redirect response when the caller is not signed in.
pub async fn require_session(
    headers: &HeaderMap,
    auth_state: &AuthState,
    pool: &PgPool,
) -> Result<Principal, Response> {
    // No cookie: nothing to clear.
    let Some(token) = extract_session_cookie(headers) else {
        return Err(Redirect::temporary(LOGIN_PATH).into_response());
    };

    let admin = match auth_state.admin().get() {
        Ok(admin) => admin,
        Err(err) => {
            error!("Failed to initialize admin handle: {err:#}");
            return Err(reject(auth_state));
        }
    };

    let claims = match admin.signer().verify(&token) {
        Ok(claims) => claims,
        Err(err) => {
            warn!("Rejected session artifact: {err}");
            return Err(reject(auth_state));
        }
    };

    if auth_state.config().check_revoked() {
        match is_session_revoked(pool, claims.jti).await {
            Ok(false) => {}
            Ok(true) => {
                warn!("Rejected revoked session {}", claims.jti);
                return Err(reject(auth_state));
            }
            Err(err) => {
                warn!("Failed to check session revocation: {err:#}");
                return Err(reject(auth_state));
            }
        }
    }

    Ok(Principal {
        uid: claims.sub,
        phone_number: claims.phone_number,
        claims: claims.claims,
    })
}

fn reject(auth_state: &AuthState) -> Response {
    let mut response = Redirect::temporary(LOGIN_PATH).into_response();
    if let Ok(cookie) = clear_session_cookie(auth_state.config()) {
        response.headers_mut().insert(SET_COOKIE, cookie);
    }
    response
}
