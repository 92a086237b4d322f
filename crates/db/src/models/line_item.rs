//! Item-level sales projection of the line-item table.

use chrono::NaiveDate;
use salesbot_core::sales::ItemSale;
use sqlx::FromRow;

/// One line joined with its order and client, already reduced to a label
/// and an amount.
#[derive(Debug, Clone, FromRow)]
pub struct ItemSaleRow {
    pub client_name: String,
    pub date: NaiveDate,
    pub order_id: String,
    pub item: String,
    pub line_total: f64,
}

impl From<ItemSaleRow> for ItemSale {
    fn from(row: ItemSaleRow) -> Self {
        ItemSale {
            client: row.client_name.trim().to_string(),
            date: row.date,
            order_id: row.order_id,
            item: row.item,
            line_total: row.line_total,
        }
    }
}
