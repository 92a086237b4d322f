//! Repository for the line-item table (`sales_items` unless renamed).

use chrono::NaiveDate;
use salesbot_core::batch::{LinePrune, LineRow};
use sqlx::PgPool;

use super::Tx;
use crate::models::line_item::ItemSaleRow;
use crate::schema::SalesSchema;

pub struct LineItemRepo;

impl LineItemRepo {
    /// Insert or replace the line at `(order_id, line_no)`.
    pub async fn upsert(
        tx: &mut Tx<'_>,
        schema: &SalesSchema,
        row: &LineRow,
    ) -> Result<(), sqlx::Error> {
        let query = format!(
            "INSERT INTO {} (order_id, line_no, sku, product_name, qty, price, total, vat, selfcost)
             VALUES ($1, $2, $3, $4, $5::float8, $6::float8, $7::float8, $8::float8, $9::float8)
             ON CONFLICT (order_id, line_no) DO UPDATE SET
                sku = EXCLUDED.sku,
                product_name = EXCLUDED.product_name,
                qty = EXCLUDED.qty,
                price = EXCLUDED.price,
                total = EXCLUDED.total,
                vat = EXCLUDED.vat,
                selfcost = EXCLUDED.selfcost",
            schema.lines()
        );
        sqlx::query(&query)
            .bind(&row.order_id)
            .bind(row.line_no)
            .bind(&row.sku)
            .bind(&row.product_name)
            .bind(row.qty)
            .bind(row.price)
            .bind(row.total)
            .bind(row.vat)
            .bind(row.selfcost)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    /// Remove lines numbered past the latest submission of an order.
    pub async fn prune(
        tx: &mut Tx<'_>,
        schema: &SalesSchema,
        prune: &LinePrune,
    ) -> Result<u64, sqlx::Error> {
        let query = format!(
            "DELETE FROM {} WHERE order_id = $1 AND line_no > $2",
            schema.lines()
        );
        let result = sqlx::query(&query)
            .bind(&prune.order_id)
            .bind(prune.keep_through)
            .execute(&mut **tx)
            .await?;
        Ok(result.rows_affected())
    }

    /// Item-level sales on or after `since`.
    ///
    /// The label falls back from product name to SKU; the amount from the
    /// stored total to `qty * price`, then zero.
    pub async fn list_item_sales_since(
        pool: &PgPool,
        schema: &SalesSchema,
        since: Option<NaiveDate>,
    ) -> Result<Vec<ItemSaleRow>, sqlx::Error> {
        let query = format!(
            "SELECT c.client_name, o.date, o.order_id,
                    COALESCE(NULLIF(TRIM(l.product_name), ''), l.sku, '') AS item,
                    COALESCE(l.total, l.qty * l.price, 0)::float8 AS line_total
             FROM {lines} l
             JOIN {orders} o ON o.order_id = l.order_id
             JOIN clients c ON c.client_id = o.client_id
             WHERE $1::date IS NULL OR o.date >= $1
             ORDER BY o.date, o.order_id, l.line_no",
            lines = schema.lines(),
            orders = schema.orders(),
        );
        sqlx::query_as::<_, ItemSaleRow>(&query)
            .bind(since)
            .fetch_all(pool)
            .await
    }
}
