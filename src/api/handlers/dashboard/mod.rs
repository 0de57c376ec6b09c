//! Overview page: headline counts, 30-day revenue and the latest orders.

pub(crate) mod stats;
pub(crate) mod storage;

use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;

use super::{
    ErrorResponse,
    auth::{AuthState, principal::require_session},
    error_response,
};
pub use stats::ChartPoint;
pub use storage::RecentOrder;
use storage::Counted;

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct DashboardStats {
    pub total_revenue: i64,
    pub products_count: i64,
    pub orders_count: i64,
    pub users_count: i64,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct DashboardPage {
    pub stats: DashboardStats,
    pub chart_data: Vec<ChartPoint>,
    pub recent_orders: Vec<RecentOrder>,
}

async fn load(pool: &PgPool) -> anyhow::Result<DashboardPage> {
    let (products_count, orders_count, users_count, recent_orders, window) = tokio::try_join!(
        storage::count(pool, Counted::Products),
        storage::count(pool, Counted::Orders),
        storage::count(pool, Counted::Profiles),
        storage::recent_orders(pool),
        storage::window_totals(pool),
    )?;

    Ok(DashboardPage {
        stats: DashboardStats {
            total_revenue: stats::total_revenue(&window),
            products_count,
            orders_count,
            users_count,
        },
        chart_data: stats::chart_data(&window),
        recent_orders,
    })
}

#[utoipa::path(
    get,
    path = "/dashboard",
    responses(
        (status = 200, description = "Overview data", body = DashboardPage),
        (status = 307, description = "Not signed in; redirect to /login"),
        (status = 500, description = "Backend failure", body = ErrorResponse)
    ),
    tag = "dashboard"
)]
pub async fn dashboard(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    if let Err(redirect) = require_session(&headers, &auth_state, &pool).await {
        return redirect;
    }

    match load(&pool).await {
        Ok(page) => (StatusCode::OK, Json(page)).into_response(),
        Err(err) => {
            error!("Failed to load dashboard stats: {err:#}");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to load dashboard.",
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::handlers::orders::storage::tests::insert_order;
    use crate::test_support::TestDb;

    #[tokio::test]
    async fn empty_backend_yields_zero_revenue() -> anyhow::Result<()> {
        let Ok(db) = TestDb::new().await else {
            return Ok(());
        };
        let page = load(db.pool()).await?;
        assert_eq!(page.stats.total_revenue, 0);
        assert!(page.chart_data.is_empty());
        assert!(page.recent_orders.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn revenue_sums_the_window() -> anyhow::Result<()> {
        let Ok(db) = TestDb::new().await else {
            return Ok(());
        };
        insert_order(db.pool(), None, None, 12_500).await?;
        insert_order(db.pool(), None, None, 7_500).await?;

        let page = load(db.pool()).await?;
        assert_eq!(page.stats.total_revenue, 20_000);
        assert_eq!(page.stats.orders_count, 2);
        assert_eq!(page.chart_data.len(), 1);
        assert_eq!(page.chart_data[0].total, 20_000);
        Ok(())
    }
}
