use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::api::handlers::orders::types::Order;

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    /// Identity-provider uid.
    pub id: String,
    pub full_name: String,
    pub email: Option<String>,
    pub phone: String,
    pub image: Option<String>,
    pub role: String,
    pub region: String,
    pub district: String,
    pub street: String,
    pub ward: String,
    pub verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    /// Shop owners are recognised by role name, in any casing.
    #[must_use]
    pub fn is_agrovet_owner(&self) -> bool {
        let role = self.role.to_lowercase();
        role.contains("owner") || role.contains("agrovet")
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Shop {
    pub id: Uuid,
    pub owner_id: String,
    pub shop_name: String,
    pub business_registration: Option<String>,
    #[schema(value_type = Object)]
    pub settings: Value,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ProductSummary {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub img: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct InventoryItem {
    pub id: Uuid,
    pub shop_id: Uuid,
    pub product_id: Option<i64>,
    pub size: String,
    pub sell_price: i64,
    pub current_stock: i32,
    pub reorder_level: i32,
    /// Absent when the catalog product was removed.
    pub product: Option<ProductSummary>,
}

impl InventoryItem {
    #[must_use]
    pub fn needs_reorder(&self) -> bool {
        self.current_stock <= self.reorder_level
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SalesTransaction {
    pub id: Uuid,
    pub shop_id: Uuid,
    pub sale_date: DateTime<Utc>,
    pub total_revenue: i64,
    pub profit: i64,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct UsersPage {
    pub users: Vec<UserProfile>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct UserDetail {
    pub user: UserProfile,
    pub is_agrovet_owner: bool,
    pub shop: Option<Shop>,
    pub inventory: Vec<InventoryItem>,
    /// Inventory rows at or below their reorder level.
    pub low_stock_count: usize,
    pub orders: Vec<Order>,
    pub sales: Vec<SalesTransaction>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct UpdateVerificationRequest {
    pub verified: bool,
}
