//! Order records and the views built from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

/// Buyer details as stored by the storefront (camelCase keys).
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CustomerInfo {
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub customer_phone: Option<String>,
    #[serde(default)]
    pub shopname: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "processing" => Ok(Self::Processing),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(format!("unknown order status: {other}")),
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    pub user_id: Option<String>,
    pub customer_info: Option<CustomerInfo>,
    pub status: String,
    #[schema(value_type = Vec<Object>)]
    pub items: Vec<Value>,
    pub subtotal: i64,
    pub shipping_cost: i64,
    pub total: i64,
    #[schema(value_type = Option<Object>)]
    pub shipping_address: Option<Value>,
    #[schema(value_type = Option<Object>)]
    pub payment_method: Option<Value>,
    #[schema(value_type = Option<Object>)]
    pub shipping_method: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    fn customer_name(&self) -> Option<&str> {
        self.customer_info
            .as_ref()
            .and_then(|info| info.customer_name.as_deref())
    }
}

/// Display number for an order: the stored one, or the id prefix.
pub(crate) fn display_order_number(order_number: Option<String>, id: Uuid) -> String {
    match order_number {
        Some(number) if !number.trim().is_empty() => number,
        _ => id.to_string()[..8].to_uppercase(),
    }
}

/// Non-array `items` payloads are treated as empty.
pub(crate) fn items_array(items: Option<Value>) -> Vec<Value> {
    match items {
        Some(Value::Array(items)) => items,
        _ => Vec::new(),
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OrderStats {
    pub total: usize,
    pub pending: usize,
    pub revenue: i64,
}

pub(crate) fn order_stats(orders: &[Order]) -> OrderStats {
    OrderStats {
        total: orders.len(),
        pending: orders
            .iter()
            .filter(|order| order.status == OrderStatus::Pending.as_str())
            .count(),
        revenue: orders.iter().map(|order| order.total).sum(),
    }
}

/// Case-insensitive match on order number or customer name.
pub(crate) fn filter_orders(orders: &[Order], query: &str) -> Vec<Order> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return orders.to_vec();
    }
    orders
        .iter()
        .filter(|order| {
            order.order_number.to_lowercase().contains(&needle)
                || order
                    .customer_name()
                    .is_some_and(|name| name.to_lowercase().contains(&needle))
        })
        .cloned()
        .collect()
}

#[derive(Deserialize, Debug, Default, IntoParams)]
pub struct OrdersQuery {
    /// Search on order number or customer name.
    pub q: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct OrdersPage {
    pub stats: OrderStats,
    pub orders: Vec<Order>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct UpdateOrderStatusRequest {
    pub status: String,
}
