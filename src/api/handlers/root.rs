use axum::{
    Json,
    extract::{Extension, Query},
    response::{IntoResponse, Redirect},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

use super::auth::{
    AuthState,
    flow::OTP_LENGTH,
    guard::{DASHBOARD_PATH, LOGIN_PATH},
};

#[derive(Deserialize, Debug, Default, IntoParams)]
pub struct LoginPageQuery {
    /// Page to return to after sign-in.
    pub redirect: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct LoginPage {
    pub country_code: String,
    pub otp_length: usize,
    pub redirect: String,
}

/// Only same-site absolute paths are honored; anything else lands on the dashboard.
pub(crate) fn safe_redirect(target: Option<&str>) -> String {
    match target.map(str::trim) {
        Some(path)
            if path.starts_with('/')
                && !path.starts_with("//")
                && !path.starts_with("/\\")
                && !path.starts_with(LOGIN_PATH) =>
        {
            path.to_string()
        }
        _ => DASHBOARD_PATH.to_string(),
    }
}

#[utoipa::path(
    get,
    path = "/",
    responses((status = 307, description = "Redirect to /dashboard")),
    tag = "pages"
)]
pub async fn root() -> impl IntoResponse {
    Redirect::temporary(DASHBOARD_PATH)
}

#[utoipa::path(
    get,
    path = "/login",
    params(LoginPageQuery),
    responses(
        (status = 200, description = "Guest login page data", body = LoginPage),
        (status = 307, description = "Already signed in; redirect to /dashboard")
    ),
    tag = "pages"
)]
pub async fn login_page(
    Query(query): Query<LoginPageQuery>,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    Json(LoginPage {
        country_code: auth_state.config().country_code().to_string(),
        otp_length: OTP_LENGTH,
        redirect: safe_redirect(query.redirect.as_deref()),
    })
}
