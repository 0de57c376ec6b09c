use anyhow::{Context, Result};
use axum::{
    Extension, Json, Router,
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Request},
    middleware,
    routing::get,
};
use sqlx::{PgPool, postgres::PgPoolOptions};
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{Span, info, info_span};
use ulid::Ulid;
use utoipa_axum::router::OpenApiRouter;

pub mod handlers;
mod openapi;

pub use openapi::openapi;

use handlers::auth::{self, AdminHandle, AdminParams, AuthConfig, AuthState};

/// Build the API router with all documented routes registered.
#[must_use]
pub fn router() -> OpenApiRouter {
    openapi::api_router()
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(openapi())
}

/// Full application: documented routes, the OpenAPI document, the edge guard
/// and the shared request layers.
pub fn app(auth_state: Arc<AuthState>, pool: PgPool) -> Router {
    let (router, _openapi) = router().split_for_parts();
    router
        .route("/api/openapi.json", get(openapi_json))
        .layer(middleware::from_fn(auth::route_guard))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(Extension(auth_state))
                .layer(Extension(pool)),
        )
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(
    port: u16,
    dsn: String,
    auth_config: AuthConfig,
    admin_params: AdminParams,
) -> Result<()> {
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(&dsn)
        .await
        .context("Failed to connect to database")?;

    // Identity client and signer are built on first use.
    let auth_state = Arc::new(AuthState::new(auth_config, AdminHandle::new(admin_params)));

    info!(
        environment = %auth_state.config().environment(),
        "Session cookie policy: secure={}, domain={:?}",
        auth_state.config().session_cookie_secure(),
        auth_state.config().session_cookie_domain()
    );

    let app = app(auth_state, pool);

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {err}");
            }
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::handlers::auth::flow::tests::FakeIdentity;
    use crate::test_support::{lazy_pool, session_cookie_header, test_auth_state};
    use axum::http::{
        StatusCode,
        header::{COOKIE, LOCATION, SET_COOKIE},
    };
    use tower::ServiceExt;

    fn test_app() -> Router {
        app(
            test_auth_state(Arc::new(FakeIdentity::accepting("123456")), false),
            lazy_pool(),
        )
    }

    async fn get(uri: &str, cookie: Option<HeaderValue>) -> axum::response::Response {
        let mut request = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            request = request.header(COOKIE, cookie);
        }
        test_app()
            .oneshot(request.body(Body::empty()).expect("request"))
            .await
            .expect("response")
    }

    async fn send_json(
        method: &str,
        uri: &str,
        cookie: HeaderValue,
        body: &'static str,
    ) -> axum::response::Response {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(COOKIE, cookie)
            .header("content-type", "application/json")
            .body(Body::from(body))
            .expect("request");
        test_app().oneshot(request).await.expect("response")
    }

    fn location(response: &axum::response::Response) -> Option<&str> {
        response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
    }

    #[tokio::test]
    async fn protected_page_without_cookie_redirects_with_return_path() {
        let response = get("/dashboard/orders", None).await;
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(location(&response), Some("/login?redirect=%2Fdashboard%2Forders"));
    }

    #[tokio::test]
    async fn login_with_cookie_redirects_to_dashboard() {
        let response = get("/login", Some(HeaderValue::from_static("__session=anything"))).await;
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(location(&response), Some("/dashboard"));
    }

    #[tokio::test]
    async fn login_page_echoes_safe_redirect() {
        let response = get("/login?redirect=%2Fdashboard%2Fusers", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let page: serde_json::Value = serde_json::from_slice(&body).expect("json");
        assert_eq!(page["redirect"], "/dashboard/users");
        assert_eq!(page["otp_length"], 6);
        assert_eq!(page["country_code"], "+255");
    }

    #[tokio::test]
    async fn expired_cookie_is_cleared_by_page_guard() {
        let cookie = session_cookie_header("uid-1", chrono::Duration::seconds(-60));
        let response = get("/dashboard", Some(cookie)).await;
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(location(&response), Some("/login"));
        let cleared = response
            .headers()
            .get(SET_COOKIE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        assert!(cleared.starts_with("__session=;"));
        assert!(cleared.contains("Max-Age=0"));
    }

    #[tokio::test]
    async fn valid_cookie_reaches_handler_and_backend_failure_is_500() {
        let cookie = session_cookie_header("uid-1", chrono::Duration::hours(1));
        let response = get("/dashboard/products", Some(cookie)).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn root_redirects_and_request_id_is_propagated() {
        let response = get("/", None).await;
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(location(&response), Some("/dashboard"));
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn openapi_document_is_served() {
        let response = get("/api/openapi.json", None).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn tampered_cookie_wins_over_malformed_action_input() {
        let cases = [
            ("PATCH", "/dashboard/orders/not-a-uuid/status", "{"),
            ("POST", "/dashboard/products", "[]"),
            ("PUT", "/dashboard/products/abc", "{}"),
            ("DELETE", "/dashboard/products/abc", ""),
            ("PATCH", "/dashboard/users/uid-1/verification", "{\"verified\":\"yes\"}"),
        ];
        for (method, uri, body) in cases {
            let response = send_json(
                method,
                uri,
                HeaderValue::from_static("__session=forged.token.value"),
                body,
            )
            .await;
            assert_eq!(
                response.status(),
                StatusCode::TEMPORARY_REDIRECT,
                "{method} {uri}"
            );
            assert_eq!(location(&response), Some("/login"), "{method} {uri}");
            let cleared = response
                .headers()
                .get(SET_COOKIE)
                .and_then(|value| value.to_str().ok())
                .unwrap_or_default();
            assert!(cleared.contains("Max-Age=0"), "{method} {uri}");
        }
    }

    #[tokio::test]
    async fn signed_in_malformed_action_input_is_bad_request() {
        let cookie = session_cookie_header("uid-1", chrono::Duration::hours(1));
        let response = send_json(
            "PATCH",
            "/dashboard/orders/not-a-uuid/status",
            cookie.clone(),
            "{\"status\":\"shipped\"}",
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = send_json("POST", "/dashboard/products", cookie, "{").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let reply: serde_json::Value = serde_json::from_slice(&body).expect("json");
        assert_eq!(reply["success"], false);
    }

    #[tokio::test]
    async fn tampered_cookie_on_login_and_dashboard() {
        let forged = HeaderValue::from_static("__session=forged.token.value");

        let response = get("/login", Some(forged.clone())).await;
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(location(&response), Some("/dashboard"));

        let response = get("/dashboard", Some(forged)).await;
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(location(&response), Some("/login"));
        let cleared = response
            .headers()
            .get(SET_COOKIE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        assert!(cleared.starts_with("__session=;"));
    }
}
