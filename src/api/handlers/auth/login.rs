//! Phone sign-in endpoints driving [`LoginFlow`] across requests.
//!
//! Pending attempts live in memory under a `login_id` until they complete or
//! expire. An attempt is taken out of the map while a request works on it and
//! restored afterwards unless it finished.

use axum::{
    Json,
    extract::Extension,
    http::{
        HeaderMap, HeaderValue, StatusCode,
        header::{RETRY_AFTER, SET_COOKIE},
    },
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use super::{
    admin::AdminApp,
    cookie::session_cookie,
    flow::{Challenge, LoginError, LoginFlow, OtpProgress},
    guard::DASHBOARD_PATH,
    session::SessionIssuer,
    state::AuthState,
    types::{
        LoginOtpRequest, LoginOtpResponse, LoginPhoneRequest, LoginPhoneResponse,
        LoginResendRequest,
    },
};
use crate::api::handlers::{ErrorResponse, error_response};

const RATE_LIMIT_RETRY_AFTER_SECONDS: &str = "900";
const LOGIN_NOT_FOUND: &str = "Sign-in attempt expired. Start again.";
const LOGIN_UNAVAILABLE: &str = "Sign-in is temporarily unavailable.";

#[utoipa::path(
    post,
    path = "/api/auth/login/phone",
    request_body = LoginPhoneRequest,
    responses(
        (status = 200, description = "Code sent", body = LoginPhoneResponse),
        (status = 400, description = "Invalid phone number, missing challenge or app verification misconfigured", body = ErrorResponse),
        (status = 404, description = "Unknown or expired attempt", body = ErrorResponse),
        (status = 429, description = "Rate limited; see Retry-After", body = ErrorResponse),
        (status = 502, description = "Provider failed to send the code", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login_phone(
    auth_state: Extension<Arc<AuthState>>,
    Json(request): Json<LoginPhoneRequest>,
) -> impl IntoResponse {
    let admin = match auth_state.admin().get() {
        Ok(admin) => admin,
        Err(err) => {
            error!("Failed to initialize admin handle: {err:#}");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, LOGIN_UNAVAILABLE);
        }
    };

    let Some(login_id) = request.login_id else {
        let mut flow = LoginFlow::new();
        if let Err(err) = send_code(&mut flow, admin, &auth_state, &request).await {
            return login_error_response(&err);
        }
        let phone_number = flow.phone_number().unwrap_or_default().to_string();
        let step = flow.step();
        let login_id = auth_state.logins().store(flow).await;
        return (
            StatusCode::OK,
            Json(LoginPhoneResponse {
                login_id,
                phone_number,
                step,
            }),
        )
            .into_response();
    };

    let Some(mut pending) = auth_state.logins().take(login_id).await else {
        return error_response(StatusCode::NOT_FOUND, LOGIN_NOT_FOUND);
    };
    let result = send_code(&mut pending.flow, admin, &auth_state, &request).await;
    let response = phone_response(&pending.flow, login_id);
    auth_state.logins().restore(login_id, pending).await;

    match result {
        Ok(()) => (StatusCode::OK, Json(response)).into_response(),
        Err(err) => login_error_response(&err),
    }
}

async fn send_code(
    flow: &mut LoginFlow,
    admin: &AdminApp,
    auth_state: &AuthState,
    request: &LoginPhoneRequest,
) -> Result<(), LoginError> {
    if let Some(challenge) = Challenge::new(&request.recaptcha_token) {
        flow.attach_challenge(challenge);
    }
    flow.send_code(
        admin.identity(),
        &request.phone_number,
        auth_state.config().country_code(),
    )
    .await
}

fn phone_response(flow: &LoginFlow, login_id: Uuid) -> LoginPhoneResponse {
    LoginPhoneResponse {
        login_id,
        phone_number: flow.phone_number().unwrap_or_default().to_string(),
        step: flow.step(),
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/login/otp",
    request_body = LoginOtpRequest,
    responses(
        (status = 200, description = "Signed in; session cookie set", body = LoginOtpResponse),
        (status = 400, description = "Code is not six digits", body = ErrorResponse),
        (status = 401, description = "Invalid code; the attempt can be retried", body = ErrorResponse),
        (status = 404, description = "Unknown or expired attempt", body = ErrorResponse),
        (status = 409, description = "Attempt is not waiting for a code", body = ErrorResponse),
        (status = 429, description = "Rate limited; see Retry-After", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login_otp(
    auth_state: Extension<Arc<AuthState>>,
    Json(request): Json<LoginOtpRequest>,
) -> impl IntoResponse {
    let admin = match auth_state.admin().get() {
        Ok(admin) => admin,
        Err(err) => {
            error!("Failed to initialize admin handle: {err:#}");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, LOGIN_UNAVAILABLE);
        }
    };

    let Some(mut pending) = auth_state.logins().take(request.login_id).await else {
        return error_response(StatusCode::NOT_FOUND, LOGIN_NOT_FOUND);
    };

    let issuer = SessionIssuer::new(admin);
    let result = pending
        .flow
        .input_otp(&request.code, admin.identity(), &issuer)
        .await;

    match result {
        Ok(OtpProgress::Authenticated(issued)) => {
            info!(
                "Signed in {} with session {}",
                issued.claims.sub, issued.claims.jti
            );
            match session_cookie(auth_state.config(), &issued.artifact) {
                Ok(cookie) => {
                    let mut headers = HeaderMap::new();
                    headers.insert(SET_COOKIE, cookie);
                    (
                        StatusCode::OK,
                        headers,
                        Json(LoginOtpResponse {
                            redirect: DASHBOARD_PATH.to_string(),
                        }),
                    )
                        .into_response()
                }
                Err(err) => {
                    error!("Failed to build session cookie: {err}");
                    error_response(StatusCode::INTERNAL_SERVER_ERROR, LOGIN_UNAVAILABLE)
                }
            }
        }
        Ok(OtpProgress::Incomplete { .. }) => {
            auth_state.logins().restore(request.login_id, pending).await;
            login_error_response(&LoginError::MalformedCode)
        }
        Err(err) => {
            auth_state.logins().restore(request.login_id, pending).await;
            login_error_response(&err)
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/login/resend",
    request_body = LoginResendRequest,
    responses(
        (status = 204, description = "Attempt returned to the phone step"),
        (status = 404, description = "Unknown or expired attempt", body = ErrorResponse),
        (status = 409, description = "Attempt is not waiting for a code", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login_resend(
    auth_state: Extension<Arc<AuthState>>,
    Json(request): Json<LoginResendRequest>,
) -> impl IntoResponse {
    let Some(mut pending) = auth_state.logins().take(request.login_id).await else {
        return error_response(StatusCode::NOT_FOUND, LOGIN_NOT_FOUND);
    };

    let result = pending.flow.resend();
    auth_state.logins().restore(request.login_id, pending).await;

    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => login_error_response(&err),
    }
}

fn login_error_response(err: &LoginError) -> Response {
    let status = match err {
        LoginError::InvalidPhoneNumber
        | LoginError::MissingChallenge
        | LoginError::MalformedCode
        | LoginError::InvalidAppCredential => StatusCode::BAD_REQUEST,
        LoginError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        LoginError::SendFailed => StatusCode::BAD_GATEWAY,
        LoginError::InvalidCode => StatusCode::UNAUTHORIZED,
        LoginError::WrongStep => StatusCode::CONFLICT,
    };

    let mut response = error_response(status, err.to_string());
    if matches!(err, LoginError::RateLimited) {
        response.headers_mut().insert(
            RETRY_AFTER,
            HeaderValue::from_static(RATE_LIMIT_RETRY_AFTER_SECONDS),
        );
    }
    response
}
