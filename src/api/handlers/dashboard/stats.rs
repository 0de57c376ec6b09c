//! Revenue rollups for the overview page.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One order's contribution to the revenue window.
#[derive(Clone, Debug)]
pub(crate) struct OrderTotal {
    pub(crate) total: i64,
    pub(crate) created_at: DateTime<Utc>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ChartPoint {
    /// Day label such as `Oct 3`.
    pub name: String,
    pub total: i64,
}

pub(crate) fn total_revenue(orders: &[OrderTotal]) -> i64 {
    orders.iter().map(|order| order.total).sum()
}

/// `en-US` short month and day, without padding (`Oct 3`).
pub(crate) fn day_label(at: DateTime<Utc>) -> String {
    at.format("%b %-d").to_string()
}

/// Sum totals per day.
///
/// `orders` must be newest first; the result runs oldest to newest.
pub(crate) fn chart_data(orders: &[OrderTotal]) -> Vec<ChartPoint> {
    let mut points: Vec<ChartPoint> = Vec::new();

    for order in orders {
        let name = day_label(order.created_at);
        match points.iter_mut().find(|point| point.name == name) {
            Some(point) => point.total += order.total,
            None => points.push(ChartPoint {
                name,
                total: order.total,
            }),
        }
    }

    points.reverse();
    points
}
