use super::flow::tests::FakeIdentity;
use super::principal::require_session;
use crate::api::app;
use crate::identity::IdentityError;
use crate::test_support::{TestDb, lazy_pool, session_cookie_header, test_auth_state};
use anyhow::Result;
use axum::{
    Router,
    body::Body,
    http::{
        HeaderMap, HeaderValue, Method, Request, StatusCode,
        header::{CONTENT_TYPE, COOKIE, LOCATION, RETRY_AFTER, SET_COOKIE},
    },
};
use serde_json::{Value, json};
use sqlx::PgPool;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

const PHONE: &str = "+255712345678";

struct Reply {
    status: StatusCode,
    headers: HeaderMap,
    body: Value,
}

impl Reply {
    fn set_cookie(&self) -> Option<&str> {
        self.headers
            .get(SET_COOKIE)
            .and_then(|value| value.to_str().ok())
    }
}

fn router(identity: FakeIdentity, pool: PgPool, check_revoked: bool) -> Router {
    app(test_auth_state(Arc::new(identity), check_revoked), pool)
}

async fn send(
    router: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
    cookie: Option<&HeaderValue>,
) -> Result<Reply> {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        request = request.header(COOKIE, cookie);
    }
    let request = match body {
        Some(body) => request
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&body)?))?,
        None => request.body(Body::empty())?,
    };

    let response = router.clone().oneshot(request).await?;
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)?
    };
    Ok(Reply {
        status,
        headers,
        body,
    })
}

async fn start_login(router: &Router, phone: &str) -> Result<Reply> {
    send(
        router,
        Method::POST,
        "/api/auth/login/phone",
        Some(json!({ "phone_number": phone, "recaptcha_token": "challenge" })),
        None,
    )
    .await
}

async fn submit_code(router: &Router, login_id: &Value, code: &str) -> Result<Reply> {
    send(
        router,
        Method::POST,
        "/api/auth/login/otp",
        Some(json!({ "login_id": login_id, "code": code })),
        None,
    )
    .await
}

#[tokio::test]
async fn create_session_sets_cookie_for_valid_assertion() -> Result<()> {
    let router = router(FakeIdentity::default(), lazy_pool(), false);
    let reply = send(
        &router,
        Method::POST,
        "/api/auth/session",
        Some(json!({ "id_token": format!("id-token:session-for-{PHONE}") })),
        None,
    )
    .await?;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body, json!({ "success": true }));
    let cookie = reply.set_cookie().unwrap_or_default();
    assert!(cookie.starts_with("__session="));
    assert!(cookie.contains("Max-Age=432000"));
    assert!(cookie.contains("HttpOnly"));
    assert!(!cookie.contains("Secure"));
    Ok(())
}

#[tokio::test]
async fn create_session_rejects_bad_assertion_without_cookie() -> Result<()> {
    let router = router(FakeIdentity::default(), lazy_pool(), false);
    let reply = send(
        &router,
        Method::POST,
        "/api/auth/session",
        Some(json!({ "id_token": "forged" })),
        None,
    )
    .await?;

    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.body, json!({ "success": false }));
    assert!(reply.set_cookie().is_none());
    Ok(())
}

#[tokio::test]
async fn deleting_a_missing_session_succeeds() -> Result<()> {
    let router = router(FakeIdentity::default(), lazy_pool(), false);
    let reply = send(&router, Method::DELETE, "/api/auth/session", None, None).await?;

    assert_eq!(reply.status, StatusCode::NO_CONTENT);
    let cookie = reply.set_cookie().unwrap_or_default();
    assert!(cookie.starts_with("__session=;"));
    assert!(cookie.contains("Max-Age=0"));
    Ok(())
}

#[tokio::test]
async fn delete_survives_revocation_storage_failure() -> Result<()> {
    let router = router(FakeIdentity::default(), lazy_pool(), true);
    let cookie = session_cookie_header("uid-1", chrono::Duration::hours(1));
    let reply = send(&router, Method::DELETE, "/api/auth/session", None, Some(&cookie)).await?;
    assert_eq!(reply.status, StatusCode::NO_CONTENT);
    Ok(())
}

#[tokio::test]
async fn phone_then_code_signs_in() -> Result<()> {
    let router = router(FakeIdentity::accepting("123456"), lazy_pool(), false);

    let reply = start_login(&router, "0712 345-678").await?;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["phone_number"], PHONE);
    assert_eq!(reply.body["step"], "otp");
    let login_id = reply.body["login_id"].clone();

    let reply = submit_code(&router, &login_id, "12345").await?;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["error"], "Enter the 6-digit code.");

    let reply = submit_code(&router, &login_id, "123456").await?;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body, json!({ "redirect": "/dashboard" }));
    assert!(reply.set_cookie().is_some_and(|c| c.starts_with("__session=")));

    // A finished attempt is gone.
    let reply = submit_code(&router, &login_id, "123456").await?;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn wrong_code_keeps_the_attempt() -> Result<()> {
    let router = router(FakeIdentity::accepting("123456"), lazy_pool(), false);
    let login_id = start_login(&router, PHONE).await?.body["login_id"].clone();

    let reply = submit_code(&router, &login_id, "000000").await?;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.body["error"], "Invalid code. Please try again.");

    let reply = submit_code(&router, &login_id, "123456").await?;
    assert_eq!(reply.status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn invalid_phone_is_rejected_before_the_provider() -> Result<()> {
    let identity = FakeIdentity::default();
    let router = router(identity, lazy_pool(), false);
    let reply = start_login(&router, "12").await?;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["error"], "Please enter a valid phone number.");
    Ok(())
}

#[tokio::test]
async fn rate_limit_carries_retry_after() -> Result<()> {
    let identity = FakeIdentity {
        send_error: Mutex::new(Some(IdentityError::RateLimited)),
        ..FakeIdentity::default()
    };
    let router = router(identity, lazy_pool(), false);

    let reply = start_login(&router, PHONE).await?;
    assert_eq!(reply.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(reply.body["error"], "Too many attempts. Wait 15 minutes.");
    assert_eq!(
        reply.headers.get(RETRY_AFTER).and_then(|v| v.to_str().ok()),
        Some("900")
    );
    Ok(())
}

#[tokio::test]
async fn app_credential_failure_is_a_distinct_message() -> Result<()> {
    let identity = FakeIdentity {
        send_error: Mutex::new(Some(IdentityError::InvalidAppCredential)),
        ..FakeIdentity::default()
    };
    let router = router(identity, lazy_pool(), false);

    let reply = start_login(&router, PHONE).await?;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        reply.body["error"],
        "Security blocked: check the app verification settings."
    );
    Ok(())
}

#[tokio::test]
async fn resend_returns_to_phone_step_and_continues() -> Result<()> {
    let router = router(FakeIdentity::accepting("123456"), lazy_pool(), false);
    let login_id = start_login(&router, PHONE).await?.body["login_id"].clone();

    let reply = send(
        &router,
        Method::POST,
        "/api/auth/login/resend",
        Some(json!({ "login_id": login_id })),
        None,
    )
    .await?;
    assert_eq!(reply.status, StatusCode::NO_CONTENT);

    // Code entry is refused until a new code is requested.
    let reply = submit_code(&router, &login_id, "123456").await?;
    assert_eq!(reply.status, StatusCode::CONFLICT);

    let reply = send(
        &router,
        Method::POST,
        "/api/auth/login/phone",
        Some(json!({
            "phone_number": PHONE,
            "recaptcha_token": "fresh-challenge",
            "login_id": login_id,
        })),
        None,
    )
    .await?;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["login_id"], login_id);

    let reply = submit_code(&router, &login_id, "123456").await?;
    assert_eq!(reply.status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn unknown_login_id_is_not_found() -> Result<()> {
    let router = router(FakeIdentity::default(), lazy_pool(), false);
    let login_id = json!(uuid::Uuid::new_v4());
    let reply = submit_code(&router, &login_id, "123456").await?;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn page_guard_without_cookie_does_not_touch_cookies() -> Result<()> {
    let state = test_auth_state(Arc::new(FakeIdentity::default()), false);
    let Err(response) = require_session(&HeaderMap::new(), &state, &lazy_pool()).await else {
        anyhow::bail!("expected redirect");
    };
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        response.headers().get(LOCATION).and_then(|v| v.to_str().ok()),
        Some("/login")
    );
    assert!(response.headers().get(SET_COOKIE).is_none());
    Ok(())
}

#[tokio::test]
async fn page_guard_accepts_valid_artifact() -> Result<()> {
    let state = test_auth_state(Arc::new(FakeIdentity::default()), false);
    let mut headers = HeaderMap::new();
    headers.insert(COOKIE, session_cookie_header("uid-7", chrono::Duration::hours(1)));

    let principal = require_session(&headers, &state, &lazy_pool())
        .await
        .map_err(|_| anyhow::anyhow!("expected principal"))?;
    assert_eq!(principal.uid, "uid-7");
    assert_eq!(principal.phone_number.as_deref(), Some(PHONE));
    Ok(())
}

#[tokio::test]
async fn page_guard_fails_closed_when_revocation_lookup_errors() -> Result<()> {
    let state = test_auth_state(Arc::new(FakeIdentity::default()), true);
    let mut headers = HeaderMap::new();
    headers.insert(COOKIE, session_cookie_header("uid-7", chrono::Duration::hours(1)));

    let Err(response) = require_session(&headers, &state, &lazy_pool()).await else {
        anyhow::bail!("expected redirect");
    };
    assert!(
        response
            .headers()
            .get(SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|cookie| cookie.contains("Max-Age=0"))
    );
    Ok(())
}

#[tokio::test]
async fn logout_revokes_the_artifact() -> Result<()> {
    let Ok(db) = TestDb::new().await else {
        return Ok(());
    };
    let state = test_auth_state(Arc::new(FakeIdentity::default()), true);
    let router = app(state.clone(), db.pool().clone());
    let cookie = session_cookie_header("uid-7", chrono::Duration::hours(1));
    let mut headers = HeaderMap::new();
    headers.insert(COOKIE, cookie.clone());

    assert!(require_session(&headers, &state, db.pool()).await.is_ok());

    let reply = send(&router, Method::DELETE, "/api/auth/session", None, Some(&cookie)).await?;
    assert_eq!(reply.status, StatusCode::NO_CONTENT);

    let Err(response) = require_session(&headers, &state, db.pool()).await else {
        anyhow::bail!("revoked artifact was accepted");
    };
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    Ok(())
}
