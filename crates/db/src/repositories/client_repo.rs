//! Repository for the `clients` table.

use salesbot_core::batch::ClientRow;

use super::Tx;

pub struct ClientRepo;

impl ClientRepo {
    /// Insert clients that do not exist yet. Existing names are left alone.
    ///
    /// Returns the number of rows actually created.
    pub async fn insert_missing(tx: &mut Tx<'_>, rows: &[ClientRow]) -> Result<u64, sqlx::Error> {
        let mut created = 0;
        for row in rows {
            created += sqlx::query(
                "INSERT INTO clients (client_id, client_name) VALUES ($1, $2)
                 ON CONFLICT (client_id) DO NOTHING",
            )
            .bind(&row.client_id)
            .bind(&row.client_name)
            .execute(&mut **tx)
            .await?
            .rows_affected();
        }
        Ok(created)
    }
}
