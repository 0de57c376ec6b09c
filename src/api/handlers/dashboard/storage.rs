//! Queries behind the overview page.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{PgPool, Row};
use tracing::Instrument;
use utoipa::ToSchema;
use uuid::Uuid;

use super::stats::OrderTotal;
use crate::api::handlers::orders::types::CustomerInfo;

pub(crate) const RECENT_ORDERS_LIMIT: i64 = 5;
pub(crate) const REVENUE_WINDOW_DAYS: i32 = 30;

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RecentOrder {
    pub id: Uuid,
    pub total: i64,
    pub customer_info: Option<CustomerInfo>,
    pub created_at: DateTime<Utc>,
    pub status: String,
}

/// Row count of one of the catalog tables.
#[derive(Clone, Copy, Debug)]
pub(crate) enum Counted {
    Products,
    Orders,
    Profiles,
}

impl Counted {
    fn query(self) -> &'static str {
        match self {
            Self::Products => "SELECT COUNT(*) AS count FROM products",
            Self::Orders => "SELECT COUNT(*) AS count FROM orders",
            Self::Profiles => "SELECT COUNT(*) AS count FROM profile",
        }
    }
}

pub(super) async fn count(pool: &PgPool, table: Counted) -> Result<i64> {
    let query = table.query();
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .fetch_one(pool)
        .instrument(span)
        .await
        .with_context(|| format!("failed to count {table:?}"))?;

    row.try_get("count").context("failed to decode count")
}

pub(super) async fn recent_orders(pool: &PgPool) -> Result<Vec<RecentOrder>> {
    let query = r"
        SELECT id, total, customer_info, created_at, status
        FROM orders
        ORDER BY created_at DESC
        LIMIT $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let rows = sqlx::query(query)
        .bind(RECENT_ORDERS_LIMIT)
        .fetch_all(pool)
        .instrument(span)
        .await
        .context("failed to load recent orders")?;

    rows.iter()
        .map(|row| -> Result<RecentOrder, sqlx::Error> {
            let customer_info: Option<Value> = row.try_get("customer_info")?;
            Ok(RecentOrder {
                id: row.try_get("id")?,
                total: row.try_get("total")?,
                customer_info: customer_info
                    .and_then(|value| serde_json::from_value(value).ok()),
                created_at: row.try_get("created_at")?,
                status: row.try_get("status")?,
            })
        })
        .collect::<Result<Vec<_>, _>>()
        .context("failed to decode recent order")
}

/// Orders inside the revenue window, newest first.
pub(super) async fn window_totals(pool: &PgPool) -> Result<Vec<OrderTotal>> {
    let query = r"
        SELECT total, created_at
        FROM orders
        WHERE created_at >= NOW() - make_interval(days => $1)
        ORDER BY created_at DESC
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let rows = sqlx::query(query)
        .bind(REVENUE_WINDOW_DAYS)
        .fetch_all(pool)
        .instrument(span)
        .await
        .context("failed to load revenue window")?;

    rows.iter()
        .map(|row| -> Result<OrderTotal, sqlx::Error> {
            Ok(OrderTotal {
                total: row.try_get("total")?,
                created_at: row.try_get("created_at")?,
            })
        })
        .collect::<Result<Vec<_>, _>>()
        .context("failed to decode order total")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::handlers::orders::storage::tests::insert_order;
    use crate::test_support::TestDb;

    #[tokio::test]
    async fn counts_and_windows_follow_the_tables() -> Result<()> {
        let Ok(db) = TestDb::new().await else {
            return Ok(());
        };
        assert_eq!(count(db.pool(), Counted::Orders).await?, 0);
        assert!(window_totals(db.pool()).await?.is_empty());

        let old = insert_order(db.pool(), Some("AGR-OLD"), None, 7_000).await?;
        sqlx::query("UPDATE orders SET created_at = NOW() - INTERVAL '45 days' WHERE id = $1")
            .bind(old)
            .execute(db.pool())
            .await?;
        for total in [1_000, 2_000] {
            insert_order(db.pool(), None, None, total).await?;
        }
        sqlx::query("INSERT INTO profile (id) VALUES ('uid-1')")
            .execute(db.pool())
            .await?;

        assert_eq!(count(db.pool(), Counted::Orders).await?, 3);
        assert_eq!(count(db.pool(), Counted::Profiles).await?, 1);
        assert_eq!(count(db.pool(), Counted::Products).await?, 0);

        let window = window_totals(db.pool()).await?;
        assert_eq!(window.len(), 2);

        let recent = recent_orders(db.pool()).await?;
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[2].id, old);
        Ok(())
    }

    #[tokio::test]
    async fn recent_orders_are_capped() -> Result<()> {
        let Ok(db) = TestDb::new().await else {
            return Ok(());
        };
        for total in 0..7 {
            insert_order(db.pool(), None, None, total).await?;
        }
        assert_eq!(recent_orders(db.pool()).await?.len(), 5);
        Ok(())
    }
}
