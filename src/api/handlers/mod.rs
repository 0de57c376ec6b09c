//! API handlers and shared response helpers for the admin dashboard.
//!
//! Page routes answer with JSON page data or redirects; form actions are
//! plain JSON endpoints. Every `/dashboard` handler runs the page guard first.

pub mod auth;
pub mod dashboard;
pub mod health;
pub mod orders;
pub mod products;
pub mod root;
pub mod users;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ErrorResponse {
    pub error: String,
}

/// Result of a form action.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ActionResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ActionResponse {
    #[must_use]
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    #[must_use]
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

pub(crate) fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

/// Path or body that failed to parse. Handlers report it only after the page
/// guard has run.
pub(crate) fn invalid_request(rejection: &impl fmt::Display) -> Response {
    debug!("Rejected request input: {rejection}");
    (
        StatusCode::BAD_REQUEST,
        Json(ActionResponse::failed("Invalid request.")),
    )
        .into_response()
}
