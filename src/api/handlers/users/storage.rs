//! Database helpers for profiles and the shop data hanging off them.

use anyhow::{Context, Result};
use serde_json::{Value, json};
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::Instrument;

use super::types::{InventoryItem, ProductSummary, SalesTransaction, Shop, UserProfile};

pub(crate) const USERS_LIMIT: i64 = 100;
pub(crate) const SALES_LIMIT: i64 = 50;

const PROFILE_COLUMNS: &str = r"
    id, full_name, email, phone, image, role, region, district, street, ward,
    verified, created_at, updated_at
";

fn profile_from_row(row: &PgRow) -> Result<UserProfile, sqlx::Error> {
    Ok(UserProfile {
        id: row.try_get("id")?,
        full_name: row.try_get("full_name")?,
        email: row.try_get("email")?,
        phone: row.try_get("phone")?,
        image: row.try_get("image")?,
        role: row.try_get("role")?,
        region: row.try_get("region")?,
        district: row.try_get("district")?,
        street: row.try_get("street")?,
        ward: row.try_get("ward")?,
        verified: row.try_get("verified")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn inventory_from_row(row: &PgRow) -> Result<InventoryItem, sqlx::Error> {
    let product_id: Option<i64> = row.try_get("product_id")?;
    let product_name: Option<String> = row.try_get("product_name")?;
    let product = match (product_id, product_name) {
        (Some(id), Some(name)) => Some(ProductSummary {
            id,
            name,
            category: row.try_get("product_category")?,
            img: row.try_get("product_img")?,
        }),
        _ => None,
    };

    Ok(InventoryItem {
        id: row.try_get("id")?,
        shop_id: row.try_get("shop_id")?,
        product_id,
        size: row.try_get("size")?,
        sell_price: row.try_get("sell_price")?,
        current_stock: row.try_get("current_stock")?,
        reorder_level: row.try_get("reorder_level")?,
        product,
    })
}

fn shop_from_row(row: &PgRow) -> Result<Shop, sqlx::Error> {
    let settings: Option<Value> = row.try_get("settings")?;
    Ok(Shop {
        id: row.try_get("id")?,
        owner_id: row.try_get("owner_id")?,
        shop_name: row.try_get("shop_name")?,
        business_registration: row.try_get("business_registration")?,
        settings: settings.unwrap_or_else(|| json!({ "currency": "TZS" })),
    })
}

/// Newest first, capped at [`USERS_LIMIT`].
pub(super) async fn list_users(pool: &PgPool) -> Result<Vec<UserProfile>> {
    let query = format!(
        "SELECT {PROFILE_COLUMNS} FROM profile ORDER BY created_at DESC LIMIT $1"
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query.as_str()
    );
    let rows = sqlx::query(&query)
        .bind(USERS_LIMIT)
        .fetch_all(pool)
        .instrument(span)
        .await
        .context("failed to list users")?;

    rows.iter()
        .map(profile_from_row)
        .collect::<Result<Vec<_>, _>>()
        .context("failed to decode profile")
}

pub(super) async fn get_user(pool: &PgPool, id: &str) -> Result<Option<UserProfile>> {
    let query = format!("SELECT {PROFILE_COLUMNS} FROM profile WHERE id = $1");
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to load user")?;

    row.as_ref()
        .map(profile_from_row)
        .transpose()
        .context("failed to decode profile")
}

pub(super) async fn get_user_shop(pool: &PgPool, owner_id: &str) -> Result<Option<Shop>> {
    let query = r"
        SELECT id, owner_id, shop_name, business_registration, settings
        FROM agrovet_shops
        WHERE owner_id = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(owner_id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to load shop")?;

    row.as_ref()
        .map(shop_from_row)
        .transpose()
        .context("failed to decode shop")
}

/// Inventory of the shop owned by `owner_id`, lowest stock first.
pub(super) async fn get_user_inventory(pool: &PgPool, owner_id: &str) -> Result<Vec<InventoryItem>> {
    let query = r"
        SELECT i.id, i.shop_id, i.product_id, i.size, i.sell_price, i.current_stock,
               i.reorder_level, p.name AS product_name, p.category AS product_category,
               p.img AS product_img
        FROM inventory i
        JOIN agrovet_shops s ON s.id = i.shop_id
        LEFT JOIN products p ON p.id = i.product_id
        WHERE s.owner_id = $1
        ORDER BY i.current_stock ASC
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let rows = sqlx::query(query)
        .bind(owner_id)
        .fetch_all(pool)
        .instrument(span)
        .await
        .context("failed to load inventory")?;

    rows.iter()
        .map(inventory_from_row)
        .collect::<Result<Vec<_>, _>>()
        .context("failed to decode inventory item")
}

/// Most recent sales of the shop owned by `owner_id`.
pub(super) async fn get_user_sales(pool: &PgPool, owner_id: &str) -> Result<Vec<SalesTransaction>> {
    let query = r"
        SELECT t.id, t.shop_id, t.sale_date, t.total_revenue, t.profit
        FROM sales_transactions t
        JOIN agrovet_shops s ON s.id = t.shop_id
        WHERE s.owner_id = $1
        ORDER BY t.sale_date DESC
        LIMIT $2
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let rows = sqlx::query(query)
        .bind(owner_id)
        .bind(SALES_LIMIT)
        .fetch_all(pool)
        .instrument(span)
        .await
        .context("failed to load sales")?;

    rows.iter()
        .map(|row| -> Result<SalesTransaction, sqlx::Error> {
            Ok(SalesTransaction {
                id: row.try_get("id")?,
                shop_id: row.try_get("shop_id")?,
                sale_date: row.try_get("sale_date")?,
                total_revenue: row.try_get("total_revenue")?,
                profit: row.try_get("profit")?,
            })
        })
        .collect::<Result<Vec<_>, _>>()
        .context("failed to decode sale")
}

/// Returns `false` when no profile has this id.
pub(super) async fn set_verified(pool: &PgPool, id: &str, verified: bool) -> Result<bool> {
    let query = "UPDATE profile SET verified = $1, updated_at = NOW() WHERE id = $2";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(verified)
        .bind(id)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to update verification")?;

    Ok(result.rows_affected() > 0)
}

/// Shop and inventory go with the profile (`ON DELETE CASCADE`).
pub(super) async fn delete_user(pool: &PgPool, id: &str) -> Result<bool> {
    let query = "DELETE FROM profile WHERE id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(id)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to delete user")?;

    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::handlers::products::storage::tests::insert_product;
    use crate::test_support::TestDb;
    use uuid::Uuid;

    async fn seed_owner(pool: &PgPool) -> Result<Uuid> {
        sqlx::query("INSERT INTO profile (id, full_name, role) VALUES ('owner-1', 'Baraka', 'agrovet_owner')")
            .execute(pool)
            .await?;
        let row = sqlx::query(
            "INSERT INTO agrovet_shops (owner_id, shop_name) VALUES ('owner-1', 'Kilimo Bora') RETURNING id",
        )
        .fetch_one(pool)
        .await?;
        Ok(row.try_get("id")?)
    }

    #[tokio::test]
    async fn inventory_joins_products_and_sorts_by_stock() -> Result<()> {
        let Ok(db) = TestDb::new().await else {
            return Ok(());
        };
        let shop_id = seed_owner(db.pool()).await?;
        let product_id = insert_product(db.pool(), "Urea").await?;
        for (product, stock) in [(Some(product_id), 12), (None, 3)] {
            sqlx::query(
                "INSERT INTO inventory (shop_id, product_id, size, current_stock) VALUES ($1, $2, '50kg', $3)",
            )
            .bind(shop_id)
            .bind(product)
            .bind(stock)
            .execute(db.pool())
            .await?;
        }

        let inventory = get_user_inventory(db.pool(), "owner-1").await?;
        assert_eq!(inventory.len(), 2);
        assert_eq!(inventory[0].current_stock, 3);
        assert!(inventory[0].product.is_none());
        assert_eq!(
            inventory[1].product.as_ref().map(|product| product.name.as_str()),
            Some("Urea")
        );

        let shop = get_user_shop(db.pool(), "owner-1").await?;
        assert_eq!(shop.map(|shop| shop.settings), Some(json!({ "currency": "TZS" })));
        Ok(())
    }

    #[tokio::test]
    async fn sales_are_capped_and_newest_first() -> Result<()> {
        let Ok(db) = TestDb::new().await else {
            return Ok(());
        };
        let shop_id = seed_owner(db.pool()).await?;
        sqlx::query(
            r"
            INSERT INTO sales_transactions (shop_id, sale_date, total_revenue)
            SELECT $1, NOW() - make_interval(days => n), n
            FROM generate_series(0, 59) AS n
            ",
        )
        .bind(shop_id)
        .execute(db.pool())
        .await?;

        let sales = get_user_sales(db.pool(), "owner-1").await?;
        assert_eq!(sales.len(), 50);
        assert_eq!(sales[0].total_revenue, 0);
        Ok(())
    }

    #[tokio::test]
    async fn user_without_shop_has_nothing_attached() -> Result<()> {
        let Ok(db) = TestDb::new().await else {
            return Ok(());
        };
        sqlx::query("INSERT INTO profile (id) VALUES ('farmer-1')")
            .execute(db.pool())
            .await?;

        assert!(get_user(db.pool(), "farmer-1").await?.is_some());
        assert!(get_user_shop(db.pool(), "farmer-1").await?.is_none());
        assert!(get_user_inventory(db.pool(), "farmer-1").await?.is_empty());
        assert!(get_user_sales(db.pool(), "farmer-1").await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn verify_and_delete_cascade() -> Result<()> {
        let Ok(db) = TestDb::new().await else {
            return Ok(());
        };
        seed_owner(db.pool()).await?;

        assert!(set_verified(db.pool(), "owner-1", true).await?);
        assert!(!set_verified(db.pool(), "missing", true).await?);
        let users = list_users(db.pool()).await?;
        assert!(users[0].verified);

        assert!(delete_user(db.pool(), "owner-1").await?);
        assert!(!delete_user(db.pool(), "owner-1").await?);
        assert!(get_user_shop(db.pool(), "owner-1").await?.is_none());
        Ok(())
    }
}
