//! Product catalog pages and actions.

pub(crate) mod storage;
pub mod types;
pub(crate) mod variants;

use axum::{
    Json,
    extract::{
        Extension, Path,
        rejection::{JsonRejection, PathRejection},
    },
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::error;

use super::{
    ActionResponse, ErrorResponse,
    auth::{AuthState, principal::require_session},
    error_response, invalid_request,
};
use types::{Product, ProductForm, ProductsPage};

fn invalid_form(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ActionResponse::failed(message)),
    )
        .into_response()
}

#[utoipa::path(
    get,
    path = "/dashboard/products",
    responses(
        (status = 200, description = "Products, newest first", body = ProductsPage),
        (status = 307, description = "Not signed in; redirect to /login"),
        (status = 500, description = "Backend failure", body = ErrorResponse)
    ),
    tag = "products"
)]
pub async fn list_products(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    if let Err(redirect) = require_session(&headers, &auth_state, &pool).await {
        return redirect;
    }

    match storage::list_products(&pool).await {
        Ok(products) => (StatusCode::OK, Json(ProductsPage { products })).into_response(),
        Err(err) => {
            error!("Failed to list products: {err:#}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to load products.")
        }
    }
}

#[utoipa::path(
    post,
    path = "/dashboard/products",
    request_body = ProductForm,
    responses(
        (status = 201, description = "Product created", body = Product),
        (status = 307, description = "Not signed in; redirect to /login"),
        (status = 400, description = "Incomplete or malformed form", body = ActionResponse),
        (status = 500, description = "Backend failure", body = ActionResponse)
    ),
    tag = "products"
)]
pub async fn create_product(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    body: Result<Json<ProductForm>, JsonRejection>,
) -> impl IntoResponse {
    if let Err(redirect) = require_session(&headers, &auth_state, &pool).await {
        return redirect;
    }

    let Json(form) = match body {
        Ok(body) => body,
        Err(rejection) => return invalid_request(&rejection),
    };

    let input = match form.validate() {
        Ok(input) => input,
        Err(message) => return invalid_form(message),
    };

    match storage::create_product(&pool, &input).await {
        Ok(product) => (StatusCode::CREATED, Json(product)).into_response(),
        Err(err) => {
            error!("Failed to create product: {err:#}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ActionResponse::failed("Failed to save product.")),
            )
                .into_response()
        }
    }
}

#[utoipa::path(
    put,
    path = "/dashboard/products/{id}",
    params(("id" = i64, Path, description = "Product id")),
    request_body = ProductForm,
    responses(
        (status = 200, description = "Product updated", body = Product),
        (status = 307, description = "Not signed in; redirect to /login"),
        (status = 400, description = "Incomplete or malformed form", body = ActionResponse),
        (status = 404, description = "Product not found", body = ActionResponse),
        (status = 500, description = "Backend failure", body = ActionResponse)
    ),
    tag = "products"
)]
pub async fn update_product(
    headers: HeaderMap,
    path: Result<Path<i64>, PathRejection>,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    body: Result<Json<ProductForm>, JsonRejection>,
) -> impl IntoResponse {
    if let Err(redirect) = require_session(&headers, &auth_state, &pool).await {
        return redirect;
    }

    let (Path(id), Json(form)) = match (path, body) {
        (Ok(path), Ok(body)) => (path, body),
        (Err(rejection), _) => return invalid_request(&rejection),
        (_, Err(rejection)) => return invalid_request(&rejection),
    };

    let input = match form.validate() {
        Ok(input) => input,
        Err(message) => return invalid_form(message),
    };

    match storage::update_product(&pool, id, &input).await {
        Ok(Some(product)) => (StatusCode::OK, Json(product)).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(ActionResponse::failed("Product not found.")),
        )
            .into_response(),
        Err(err) => {
            error!("Failed to update product: {err:#}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ActionResponse::failed("Failed to save product.")),
            )
                .into_response()
        }
    }
}

#[utoipa::path(
    delete,
    path = "/dashboard/products/{id}",
    params(("id" = i64, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product removed (or already absent)", body = ActionResponse),
        (status = 307, description = "Not signed in; redirect to /login"),
        (status = 400, description = "Malformed product id", body = ActionResponse),
        (status = 500, description = "Backend failure", body = ActionResponse)
    ),
    tag = "products"
)]
pub async fn delete_product(
    headers: HeaderMap,
    path: Result<Path<i64>, PathRejection>,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    if let Err(redirect) = require_session(&headers, &auth_state, &pool).await {
        return redirect;
    }

    let Path(id) = match path {
        Ok(path) => path,
        Err(rejection) => return invalid_request(&rejection),
    };

    match storage::delete_product(&pool, id).await {
        Ok(_) => (StatusCode::OK, Json(ActionResponse::ok())).into_response(),
        Err(err) => {
            error!("Failed to delete product: {err:#}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ActionResponse::failed("Failed to delete product.")),
            )
                .into_response()
        }
    }
}
