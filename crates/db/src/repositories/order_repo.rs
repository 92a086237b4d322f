//! Repository for the orders table (`sales` unless renamed).

use chrono::NaiveDate;
use salesbot_core::batch::OrderRow;
use sqlx::PgPool;

use super::Tx;
use crate::models::order::OrderRecord;
use crate::schema::SalesSchema;

/// Select list for [`OrderRecord`]; expects the orders table aliased `o`
/// joined with `clients c`.
const COLUMNS: &str = "o.order_id, o.client_id, c.client_name, o.date, \
    o.total_sum::float8 AS total_sum, o.price_type, o.status, o.updated_at";

pub struct OrderRepo;

impl OrderRepo {
    /// Delete orders by id. Line items go with them via `ON DELETE CASCADE`.
    pub async fn delete_many(
        tx: &mut Tx<'_>,
        schema: &SalesSchema,
        order_ids: &[String],
    ) -> Result<u64, sqlx::Error> {
        if order_ids.is_empty() {
            return Ok(0);
        }
        let query = format!("DELETE FROM {} WHERE order_id = ANY($1)", schema.orders());
        let result = sqlx::query(&query)
            .bind(order_ids)
            .execute(&mut **tx)
            .await?;
        Ok(result.rows_affected())
    }

    /// Insert or fully replace the scalar columns of one order.
    pub async fn upsert(
        tx: &mut Tx<'_>,
        schema: &SalesSchema,
        row: &OrderRow,
    ) -> Result<(), sqlx::Error> {
        let query = format!(
            "INSERT INTO {} (order_id, client_id, date, total_sum, price_type, status)
             VALUES ($1, $2, $3, $4::float8, $5, 'confirmed')
             ON CONFLICT (order_id) DO UPDATE SET
                client_id = EXCLUDED.client_id,
                date = EXCLUDED.date,
                total_sum = EXCLUDED.total_sum,
                price_type = EXCLUDED.price_type,
                status = EXCLUDED.status,
                updated_at = NOW()",
            schema.orders()
        );
        sqlx::query(&query)
            .bind(&row.order_id)
            .bind(&row.client_id)
            .bind(row.date)
            .bind(row.total_sum)
            .bind(&row.price_type)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    /// Orders on or after `since` (all when `None`), oldest first.
    pub async fn list_since(
        pool: &PgPool,
        schema: &SalesSchema,
        since: Option<NaiveDate>,
    ) -> Result<Vec<OrderRecord>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM {} o JOIN clients c ON c.client_id = o.client_id
             WHERE $1::date IS NULL OR o.date >= $1
             ORDER BY o.date, o.order_id",
            schema.orders()
        );
        sqlx::query_as::<_, OrderRecord>(&query)
            .bind(since)
            .fetch_all(pool)
            .await
    }

    /// Number of stored orders.
    pub async fn count(pool: &PgPool, schema: &SalesSchema) -> Result<i64, sqlx::Error> {
        let query = format!("SELECT COUNT(*) FROM {}", schema.orders());
        let (count,): (i64,) = sqlx::query_as(&query).fetch_one(pool).await?;
        Ok(count)
    }
}
