//! Database helpers for the product catalog.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;
use sqlx::{PgPool, Row, postgres::PgRow, types::Json};
use tracing::Instrument;

use super::{
    types::{PriceItem, Product, ProductInput},
    variants::merge_prices,
};

const PRODUCT_COLUMNS: &str = r"
    id, created_at, name, category, img, measure, description, key_features,
    usage_instructions, benefits, specifications, tags, is_exclusive, is_featured,
    is_popular, sales_count, farmer_price, agrovet_price
";

/// Malformed JSONB is read as absent.
fn json_column<T: DeserializeOwned>(row: &PgRow, column: &str) -> Result<Option<T>, sqlx::Error> {
    let value: Option<Value> = row.try_get(column)?;
    Ok(value.and_then(|value| serde_json::from_value(value).ok()))
}

fn product_from_row(row: &PgRow) -> Result<Product, sqlx::Error> {
    let farmer_price: Vec<PriceItem> = json_column(row, "farmer_price")?.unwrap_or_default();
    let agrovet_price: Vec<PriceItem> = json_column(row, "agrovet_price")?.unwrap_or_default();
    let variants = merge_prices(&farmer_price, &agrovet_price);

    Ok(Product {
        id: row.try_get("id")?,
        created_at: row.try_get("created_at")?,
        name: row.try_get("name")?,
        category: row.try_get("category")?,
        img: row.try_get("img")?,
        measure: row.try_get("measure")?,
        description: row.try_get("description")?,
        key_features: json_column(row, "key_features")?,
        usage_instructions: json_column(row, "usage_instructions")?,
        benefits: json_column(row, "benefits")?,
        specifications: json_column(row, "specifications")?,
        tags: json_column(row, "tags")?,
        is_exclusive: row.try_get("is_exclusive")?,
        is_featured: row.try_get("is_featured")?,
        is_popular: row.try_get("is_popular")?,
        sales_count: row.try_get("sales_count")?,
        farmer_price,
        agrovet_price,
        variants,
    })
}

/// Newest first.
pub(super) async fn list_products(pool: &PgPool) -> Result<Vec<Product>> {
    let query = format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY created_at DESC, id DESC");
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query.as_str()
    );
    let rows = sqlx::query(&query)
        .fetch_all(pool)
        .instrument(span)
        .await
        .context("failed to list products")?;

    rows.iter()
        .map(product_from_row)
        .collect::<Result<Vec<_>, _>>()
        .context("failed to decode product")
}

pub(super) async fn create_product(pool: &PgPool, input: &ProductInput) -> Result<Product> {
    let query = format!(
        r"
        INSERT INTO products
            (name, category, img, measure, description, is_exclusive, is_featured,
             is_popular, farmer_price, agrovet_price)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING {PRODUCT_COLUMNS}
        "
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(&input.name)
        .bind(&input.category)
        .bind(&input.img)
        .bind(&input.measure)
        .bind(&input.description)
        .bind(input.is_exclusive)
        .bind(input.is_featured)
        .bind(input.is_popular)
        .bind(Json(&input.farmer_price))
        .bind(Json(&input.agrovet_price))
        .fetch_one(pool)
        .instrument(span)
        .await
        .context("failed to create product")?;

    product_from_row(&row).context("failed to decode product")
}

/// `None` when no product has this id.
pub(super) async fn update_product(
    pool: &PgPool,
    id: i64,
    input: &ProductInput,
) -> Result<Option<Product>> {
    let query = format!(
        r"
        UPDATE products
        SET name = $1, category = $2, img = $3, measure = $4, description = $5,
            is_exclusive = $6, is_featured = $7, is_popular = $8,
            farmer_price = $9, agrovet_price = $10
        WHERE id = $11
        RETURNING {PRODUCT_COLUMNS}
        "
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(&input.name)
        .bind(&input.category)
        .bind(&input.img)
        .bind(&input.measure)
        .bind(&input.description)
        .bind(input.is_exclusive)
        .bind(input.is_featured)
        .bind(input.is_popular)
        .bind(Json(&input.farmer_price))
        .bind(Json(&input.agrovet_price))
        .bind(id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to update product")?;

    row.as_ref()
        .map(product_from_row)
        .transpose()
        .context("failed to decode product")
}

/// Returns the number of rows removed.
pub(super) async fn delete_product(pool: &PgPool, id: i64) -> Result<u64> {
    let query = "DELETE FROM products WHERE id = $1";
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
        .context("failed to delete product")?;

    Ok(result.rows_affected())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::test_support::TestDb;
    use serde_json::json;

    fn input(name: &str) -> ProductInput {
        ProductInput {
            name: name.to_string(),
            category: "Fertilizer".to_string(),
            img: None,
            measure: Some("kg".to_string()),
            description: None,
            is_exclusive: false,
            is_featured: false,
            is_popular: true,
            farmer_price: vec![PriceItem {
                size: "50kg".to_string(),
                amount: 95_000,
            }],
            agrovet_price: vec![PriceItem {
                size: "50kg".to_string(),
                amount: 88_000,
            }],
        }
    }

    pub(crate) async fn insert_product(pool: &PgPool, name: &str) -> Result<i64> {
        let row = sqlx::query("INSERT INTO products (name) VALUES ($1) RETURNING id")
            .bind(name)
            .fetch_one(pool)
            .await?;
        Ok(row.try_get("id")?)
    }

    #[tokio::test]
    async fn create_then_list_merges_variants() -> Result<()> {
        let Ok(db) = TestDb::new().await else {
            return Ok(());
        };
        let created = create_product(db.pool(), &input("Urea")).await?;
        assert_eq!(created.name, "Urea");
        assert_eq!(created.variants.len(), 1);
        assert_eq!(created.variants[0].farmer, 95_000);
        assert_eq!(created.variants[0].agrovet, 88_000);

        let products = list_products(db.pool()).await?;
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].id, created.id);
        Ok(())
    }

    #[tokio::test]
    async fn update_and_delete_report_missing_rows() -> Result<()> {
        let Ok(db) = TestDb::new().await else {
            return Ok(());
        };
        let created = create_product(db.pool(), &input("Urea")).await?;

        let updated = update_product(db.pool(), created.id, &input("DAP")).await?;
        assert_eq!(updated.map(|product| product.name).as_deref(), Some("DAP"));
        assert!(update_product(db.pool(), created.id + 1000, &input("DAP"))
            .await?
            .is_none());

        assert_eq!(delete_product(db.pool(), created.id).await?, 1);
        assert_eq!(delete_product(db.pool(), created.id).await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn malformed_price_json_reads_as_empty() -> Result<()> {
        let Ok(db) = TestDb::new().await else {
            return Ok(());
        };
        let id = insert_product(db.pool(), "Odd").await?;
        sqlx::query("UPDATE products SET farmer_price = $1, tags = $2 WHERE id = $3")
            .bind(json!({ "not": "a list" }))
            .bind(json!(["organic"]))
            .bind(id)
            .execute(db.pool())
            .await?;

        let products = list_products(db.pool()).await?;
        assert!(products[0].farmer_price.is_empty());
        assert!(products[0].variants.is_empty());
        assert_eq!(products[0].tags, Some(vec!["organic".to_string()]));
        Ok(())
    }
}
