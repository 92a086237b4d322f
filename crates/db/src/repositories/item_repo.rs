//! Repository for the `items` table.

use salesbot_core::batch::ItemRow;

use super::Tx;

pub struct ItemRepo;

impl ItemRepo {
    /// Insert SKUs that do not exist yet as active items.
    pub async fn insert_missing(tx: &mut Tx<'_>, rows: &[ItemRow]) -> Result<u64, sqlx::Error> {
        let mut created = 0;
        for row in rows {
            created += sqlx::query(
                "INSERT INTO items (sku, product_name, is_active) VALUES ($1, $2, TRUE)
                 ON CONFLICT (sku) DO NOTHING",
            )
            .bind(&row.sku)
            .bind(&row.product_name)
            .execute(&mut **tx)
            .await?
            .rows_affected();
        }
        Ok(created)
    }
}
