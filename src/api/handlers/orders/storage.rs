//! Database helpers for orders.

use anyhow::{Context, Result};
use serde_json::Value;
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::Instrument;
use uuid::Uuid;

use super::types::{CustomerInfo, Order, OrderStatus, display_order_number, items_array};

pub(crate) fn order_from_row(row: &PgRow) -> Result<Order, sqlx::Error> {
    let id: Uuid = row.try_get("id")?;
    let customer_info: Option<Value> = row.try_get("customer_info")?;

    Ok(Order {
        id,
        order_number: display_order_number(row.try_get("order_number")?, id),
        user_id: row.try_get("user_id")?,
        customer_info: customer_info
            .and_then(|value| serde_json::from_value::<CustomerInfo>(value).ok()),
        status: row.try_get("status")?,
        items: items_array(row.try_get("items")?),
        subtotal: row.try_get("subtotal")?,
        shipping_cost: row.try_get("shipping_cost")?,
        total: row.try_get("total")?,
        shipping_address: row.try_get("shipping_address")?,
        payment_method: row.try_get("payment_method")?,
        shipping_method: row.try_get("shipping_method")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// All orders, newest first.
pub(super) async fn list_orders(pool: &PgPool) -> Result<Vec<Order>> {
    let query = r"
        SELECT id, order_number, user_id, customer_info, status, items, subtotal,
               shipping_cost, total, shipping_address, payment_method, shipping_method,
               created_at, updated_at
        FROM orders
        ORDER BY created_at DESC
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let rows = sqlx::query(query)
        .fetch_all(pool)
        .instrument(span)
        .await
        .context("failed to list orders")?;

    rows.iter()
        .map(order_from_row)
        .collect::<Result<Vec<_>, _>>()
        .context("failed to decode order")
}

/// Orders placed by one user, newest first.
pub(crate) async fn list_user_orders(pool: &PgPool, user_id: &str) -> Result<Vec<Order>> {
    let query = r"
        SELECT id, order_number, user_id, customer_info, status, items, subtotal,
               shipping_cost, total, shipping_address, payment_method, shipping_method,
               created_at, updated_at
        FROM orders
        WHERE user_id = $1
        ORDER BY created_at DESC
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let rows = sqlx::query(query)
        .bind(user_id)
        .fetch_all(pool)
        .instrument(span)
        .await
        .context("failed to list user orders")?;

    rows.iter()
        .map(order_from_row)
        .collect::<Result<Vec<_>, _>>()
        .context("failed to decode order")
}

/// Returns `false` when no order has this id.
pub(super) async fn update_order_status(
    pool: &PgPool,
    id: Uuid,
    status: OrderStatus,
) -> Result<bool> {
    let query = "UPDATE orders SET status = $1, updated_at = NOW() WHERE id = $2";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(status.as_str())
        .bind(id)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to update order status")?;

    Ok(result.rows_affected() > 0)
}
