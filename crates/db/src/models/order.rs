//! Order entity model.

use chrono::{DateTime, NaiveDate, Utc};
use salesbot_core::sales::Order;
use serde::Serialize;
use sqlx::FromRow;

/// A row from the orders table joined with its client's display name.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct OrderRecord {
    pub order_id: String,
    pub client_id: String,
    pub client_name: String,
    pub date: NaiveDate,
    pub total_sum: f64,
    pub price_type: String,
    pub status: String,
    pub updated_at: DateTime<Utc>,
}

impl From<OrderRecord> for Order {
    fn from(row: OrderRecord) -> Self {
        Order {
            order_id: row.order_id,
            client: row.client_name.trim().to_string(),
            date: row.date,
            total_sum: row.total_sum,
            price_type: row.price_type,
        }
    }
}
