//! Order management pages and actions.

pub(crate) mod storage;
pub mod types;

use axum::{
    Json,
    extract::{
        Extension, Path, Query,
        rejection::{JsonRejection, PathRejection},
    },
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::error;
use uuid::Uuid;

use super::{
    ActionResponse, ErrorResponse,
    auth::{AuthState, principal::require_session},
    error_response, invalid_request,
};
use types::{OrderStatus, OrdersPage, OrdersQuery, UpdateOrderStatusRequest, filter_orders, order_stats};

#[utoipa::path(
    get,
    path = "/dashboard/orders",
    params(OrdersQuery),
    responses(
        (status = 200, description = "Orders, newest first, with stats over all orders", body = OrdersPage),
        (status = 307, description = "Not signed in; redirect to /login"),
        (status = 500, description = "Backend failure", body = ErrorResponse)
    ),
    tag = "orders"
)]
pub async fn list_orders(
    headers: HeaderMap,
    Query(query): Query<OrdersQuery>,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    if let Err(redirect) = require_session(&headers, &auth_state, &pool).await {
        return redirect;
    }

    match storage::list_orders(&pool).await {
        Ok(orders) => {
            let stats = order_stats(&orders);
            let orders = filter_orders(&orders, query.q.as_deref().unwrap_or_default());
            (StatusCode::OK, Json(OrdersPage { stats, orders })).into_response()
        }
        Err(err) => {
            error!("Failed to list orders: {err:#}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to load orders.")
        }
    }
}

#[utoipa::path(
    patch,
    path = "/dashboard/orders/{id}/status",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = ActionResponse),
        (status = 307, description = "Not signed in; redirect to /login"),
        (status = 400, description = "Unknown status or malformed request", body = ActionResponse),
        (status = 404, description = "Order not found", body = ActionResponse),
        (status = 500, description = "Backend failure", body = ActionResponse)
    ),
    tag = "orders"
)]
pub async fn update_order_status(
    headers: HeaderMap,
    path: Result<Path<Uuid>, PathRejection>,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    body: Result<Json<UpdateOrderStatusRequest>, JsonRejection>,
) -> impl IntoResponse {
    if let Err(redirect) = require_session(&headers, &auth_state, &pool).await {
        return redirect;
    }

    let (Path(id), Json(request)) = match (path, body) {
        (Ok(path), Ok(body)) => (path, body),
        (Err(rejection), _) => return invalid_request(&rejection),
        (_, Err(rejection)) => return invalid_request(&rejection),
    };

    let Ok(status) = request.status.parse::<OrderStatus>() else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ActionResponse::failed(format!(
                "Unknown order status: {}",
                request.status
            ))),
        )
            .into_response();
    };

    match storage::update_order_status(&pool, id, status).await {
        Ok(true) => (StatusCode::OK, Json(ActionResponse::ok())).into_response(),
        Ok(false) => (
            StatusCode::NOT_FOUND,
            Json(ActionResponse::failed("Order not found.")),
        )
            .into_response(),
        Err(err) => {
            error!("Failed to update order status: {err:#}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ActionResponse::failed("Failed to update status.")),
            )
                .into_response()
        }
    }
}
