//! User directory, per-user detail, and account moderation.

pub(crate) mod storage;
pub mod types;

use axum::{
    Json,
    extract::{Extension, Path, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::error;

use super::{
    ActionResponse, ErrorResponse,
    auth::{AuthState, principal::require_session},
    error_response, invalid_request,
    orders::storage::list_user_orders,
};
use types::{InventoryItem, UpdateVerificationRequest, UserDetail, UsersPage};

#[utoipa::path(
    get,
    path = "/dashboard/users",
    responses(
        (status = 200, description = "Up to 100 profiles, newest first", body = UsersPage),
        (status = 307, description = "Not signed in; redirect to /login"),
        (status = 500, description = "Backend failure", body = ErrorResponse)
    ),
    tag = "users"
)]
pub async fn list_users(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    if let Err(redirect) = require_session(&headers, &auth_state, &pool).await {
        return redirect;
    }

    match storage::list_users(&pool).await {
        Ok(users) => (StatusCode::OK, Json(UsersPage { users })).into_response(),
        Err(err) => {
            error!("Failed to list users: {err:#}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to load users.")
        }
    }
}

fn low_stock_count(inventory: &[InventoryItem]) -> usize {
    inventory.iter().filter(|item| item.needs_reorder()).count()
}

async fn load_detail(pool: &PgPool, id: &str) -> anyhow::Result<Option<UserDetail>> {
    let (user, shop, inventory, orders, sales) = tokio::try_join!(
        storage::get_user(pool, id),
        storage::get_user_shop(pool, id),
        storage::get_user_inventory(pool, id),
        list_user_orders(pool, id),
        storage::get_user_sales(pool, id),
    )?;

    Ok(user.map(|user| UserDetail {
        is_agrovet_owner: user.is_agrovet_owner(),
        user,
        shop,
        low_stock_count: low_stock_count(&inventory),
        inventory,
        orders,
        sales,
    }))
}

#[utoipa::path(
    get,
    path = "/dashboard/users/{id}",
    params(("id" = String, Path, description = "Profile id (identity-provider uid)")),
    responses(
        (status = 200, description = "Profile with shop, inventory, orders and sales", body = UserDetail),
        (status = 307, description = "Not signed in; redirect to /login"),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 500, description = "Backend failure", body = ErrorResponse)
    ),
    tag = "users"
)]
pub async fn get_user(
    headers: HeaderMap,
    Path(id): Path<String>,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    if let Err(redirect) = require_session(&headers, &auth_state, &pool).await {
        return redirect;
    }

    match load_detail(&pool, &id).await {
        Ok(Some(detail)) => (StatusCode::OK, Json(detail)).into_response(),
        Ok(None) => error_response(StatusCode::NOT_FOUND, "User not found."),
        Err(err) => {
            error!("Failed to load user {id}: {err:#}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to load user.")
        }
    }
}

#[utoipa::path(
    patch,
    path = "/dashboard/users/{id}/verification",
    params(("id" = String, Path, description = "Profile id")),
    request_body = UpdateVerificationRequest,
    responses(
        (status = 204, description = "Verification updated"),
        (status = 307, description = "Not signed in; redirect to /login"),
        (status = 400, description = "Malformed request body", body = ActionResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 500, description = "Backend failure", body = ErrorResponse)
    ),
    tag = "users"
)]
pub async fn update_verification(
    headers: HeaderMap,
    Path(id): Path<String>,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    body: Result<Json<UpdateVerificationRequest>, JsonRejection>,
) -> impl IntoResponse {
    if let Err(redirect) = require_session(&headers, &auth_state, &pool).await {
        return redirect;
    }

    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => return invalid_request(&rejection),
    };

    match storage::set_verified(&pool, &id, request.verified).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => error_response(StatusCode::NOT_FOUND, "User not found."),
        Err(err) => {
            error!("Failed to update verification: {err:#}");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to update verification status",
            )
        }
    }
}

#[utoipa::path(
    delete,
    path = "/dashboard/users/{id}",
    params(("id" = String, Path, description = "Profile id")),
    responses(
        (status = 204, description = "User deleted with their shop and inventory"),
        (status = 307, description = "Not signed in; redirect to /login"),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 500, description = "Backend failure", body = ErrorResponse)
    ),
    tag = "users"
)]
pub async fn delete_user(
    headers: HeaderMap,
    Path(id): Path<String>,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    if let Err(redirect) = require_session(&headers, &auth_state, &pool).await {
        return redirect;
    }

    match storage::delete_user(&pool, &id).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => error_response(StatusCode::NOT_FOUND, "User not found."),
        Err(err) => {
            error!("Failed to delete user: {err:#}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to delete user")
        }
    }
}
