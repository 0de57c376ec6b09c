//! Edge route guard.
//!
//! Runs in front of every matched request and only looks at whether the
//! session cookie is present. It never verifies the artifact; that is the page
//! guard's job (see `principal`).

use axum::{
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use url::form_urlencoded;

use super::cookie::extract_session_cookie;

pub(crate) const LOGIN_PATH: &str = "/login";
pub(crate) const DASHBOARD_PATH: &str = "/dashboard";

const EXCLUDED_PREFIXES: [&str; 4] = ["api", "_next/static", "_next/image", "favicon.ico"];
const EXCLUDED_EXTENSIONS: [&str; 6] = [".svg", ".png", ".jpg", ".jpeg", ".gif", ".webp"];

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum GuardDecision {
    Allow,
    RedirectToLogin { return_to: String },
    RedirectToDashboard,
}

/// Paths the guard applies to: everything except API routes and static assets.
pub(crate) fn is_guarded_path(path: &str) -> bool {
    let rest = path.strip_prefix('/').unwrap_or(path);
    if EXCLUDED_PREFIXES.iter().any(|prefix| rest.starts_with(prefix)) {
        return false;
    }
    let lower = rest.to_ascii_lowercase();
    !EXCLUDED_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

pub(crate) fn decide(path: &str, has_cookie: bool) -> GuardDecision {
    let is_protected_route = path.starts_with(DASHBOARD_PATH);
    let is_auth_route = path.starts_with(LOGIN_PATH);

    if is_protected_route && !has_cookie {
        return GuardDecision::RedirectToLogin {
            return_to: path.to_string(),
        };
    }
    if is_auth_route && has_cookie {
        return GuardDecision::RedirectToDashboard;
    }
    GuardDecision::Allow
}

/// `/login?redirect=<path>` with the path form-encoded.
pub(crate) fn login_redirect_target(return_to: &str) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("redirect", return_to)
        .finish();
    format!("{LOGIN_PATH}?{query}")
}

pub async fn route_guard(request: Request, next: Next) -> Response {
    let path = request.uri().path();
    if !is_guarded_path(path) {
        return next.run(request).await;
    }

    let has_cookie = extract_session_cookie(request.headers()).is_some();
    match decide(path, has_cookie) {
        GuardDecision::Allow => next.run(request).await,
        GuardDecision::RedirectToLogin { return_to } => {
            Redirect::temporary(&login_redirect_target(&return_to)).into_response()
        }
        GuardDecision::RedirectToDashboard => Redirect::temporary(DASHBOARD_PATH).into_response(),
    }
}
