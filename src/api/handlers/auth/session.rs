//! Session issuer: exchanges an identity assertion for the `__session` cookie.

use async_trait::async_trait;
use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    response::IntoResponse,
};
use chrono::Duration;
use sqlx::PgPool;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::{
    admin::AdminApp,
    artifact::{ArtifactError, SessionClaims},
    cookie::{clear_session_cookie, extract_session_cookie, session_cookie},
    flow::SessionExchange,
    state::{AuthState, SESSION_TTL_SECONDS},
    storage::revoke_session,
    types::{CreateSessionRequest, CreateSessionResponse},
};
use crate::identity::{IdentityAssertion, IdentityError};

#[derive(Debug, Error)]
pub enum SessionIssueError {
    #[error("missing identity assertion")]
    MissingAssertion,
    #[error(transparent)]
    Identity(#[from] IdentityError),
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}

pub struct IssuedSession {
    pub artifact: String,
    pub claims: SessionClaims,
}

pub(crate) struct SessionIssuer<'a> {
    admin: &'a AdminApp,
}

impl<'a> SessionIssuer<'a> {
    pub(crate) fn new(admin: &'a AdminApp) -> Self {
        Self { admin }
    }

    /// Verify `id_token` with the provider and mint a fresh five-day artifact.
    pub(crate) async fn issue(&self, id_token: &str) -> Result<IssuedSession, SessionIssueError> {
        let id_token = id_token.trim();
        if id_token.is_empty() {
            return Err(SessionIssueError::MissingAssertion);
        }

        let identity = self.admin.identity().verify_assertion(id_token).await?;
        let (artifact, claims) = self
            .admin
            .signer()
            .mint(&identity, Duration::seconds(SESSION_TTL_SECONDS))?;

        Ok(IssuedSession { artifact, claims })
    }
}

#[async_trait]
impl SessionExchange for SessionIssuer<'_> {
    type Session = IssuedSession;
    type Error = SessionIssueError;

    async fn exchange(
        &self,
        assertion: &IdentityAssertion,
    ) -> Result<IssuedSession, SessionIssueError> {
        self.issue(assertion.id_token()).await
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/session",
    request_body = CreateSessionRequest,
    responses(
        (status = 200, description = "Session cookie set", body = CreateSessionResponse),
        (status = 401, description = "Assertion rejected", body = CreateSessionResponse),
        (status = 500, description = "Admin credentials unavailable", body = CreateSessionResponse)
    ),
    tag = "auth"
)]
pub async fn create_session(
    auth_state: Extension<Arc<AuthState>>,
    Json(request): Json<CreateSessionRequest>,
) -> impl IntoResponse {
    let admin = match auth_state.admin().get() {
        Ok(admin) => admin,
        Err(err) => {
            error!("Failed to initialize admin handle: {err:#}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(CreateSessionResponse { success: false }),
            )
                .into_response();
        }
    };

    let issued = match SessionIssuer::new(admin).issue(&request.id_token).await {
        Ok(issued) => issued,
        Err(err) => {
            error!("Failed to create session: {err}");
            return (
                StatusCode::UNAUTHORIZED,
                Json(CreateSessionResponse { success: false }),
            )
                .into_response();
        }
    };

    info!("Created session {} for {}", issued.claims.jti, issued.claims.sub);

    match session_cookie(auth_state.config(), &issued.artifact) {
        Ok(cookie) => {
            let mut headers = HeaderMap::new();
            headers.insert(SET_COOKIE, cookie);
            (
                StatusCode::OK,
                headers,
                Json(CreateSessionResponse { success: true }),
            )
                .into_response()
        }
        Err(err) => {
            error!("Failed to build session cookie: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(CreateSessionResponse { success: false }),
            )
                .into_response()
        }
    }
}

#[utoipa::path(
    delete,
    path = "/api/auth/session",
    responses(
        (status = 204, description = "Session cookie cleared")
    ),
    tag = "auth"
)]
pub async fn delete_session(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    if let Some(token) = extract_session_cookie(&headers) {
        revoke_presented_session(&auth_state, &pool, &token).await;
    }

    // Always clear the cookie, even when nothing was presented.
    let mut response_headers = HeaderMap::new();
    if let Ok(cookie) = clear_session_cookie(auth_state.config()) {
        response_headers.insert(SET_COOKIE, cookie);
    }
    (StatusCode::NO_CONTENT, response_headers).into_response()
}

/// Best effort: failures are logged and never fail the logout.
async fn revoke_presented_session(auth_state: &AuthState, pool: &PgPool, token: &str) {
    let admin = match auth_state.admin().get() {
        Ok(admin) => admin,
        Err(err) => {
            warn!("Skipping session revocation: {err:#}");
            return;
        }
    };

    let claims = match admin.signer().verify(token) {
        Ok(claims) => claims,
        Err(err) => {
            debug!("Not revoking unusable session artifact: {err}");
            return;
        }
    };

    let Some(expires_at) = claims.expires_at() else {
        return;
    };

    if let Err(err) = revoke_session(pool, claims.jti, expires_at).await {
        error!("Failed to revoke session: {err:#}");
    }
}
