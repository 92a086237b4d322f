//! Table naming for the order and line-item tables.
//!
//! The migrations create `sales` / `sales_items`. Deployments that keep
//! orders under another name pass it through `PG_TABLE`; the line-item table
//! is always `<table>_items`. Names are interpolated into SQL, so they are
//! validated as plain identifiers up front.

use salesbot_core::error::CoreError;
use sqlx::PgPool;

/// Postgres truncates identifiers at 63 bytes; leave room for suffixes.
const MAX_TABLE_LEN: usize = 48;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SalesSchema {
    orders: String,
    lines: String,
}

impl SalesSchema {
    pub const DEFAULT_TABLE: &'static str = "sales";

    pub fn new(table: &str) -> Result<Self, CoreError> {
        let table = table.trim();
        if !is_identifier(table) {
            return Err(CoreError::Config(format!(
                "invalid table name '{table}': expected [A-Za-z_][A-Za-z0-9_]* up to {MAX_TABLE_LEN} chars"
            )));
        }
        let orders = table.to_ascii_lowercase();
        Ok(Self {
            lines: format!("{orders}_items"),
            orders,
        })
    }

    pub fn orders(&self) -> &str {
        &self.orders
    }

    pub fn lines(&self) -> &str {
        &self.lines
    }

    /// Whether the migrations already cover these tables.
    pub fn is_default(&self) -> bool {
        self.orders == Self::DEFAULT_TABLE
    }

    /// `CREATE ... IF NOT EXISTS` statements for the order and line tables.
    ///
    /// `clients` and `items` are shared and always come from the migrations.
    pub fn ddl(&self) -> Vec<String> {
        let orders = &self.orders;
        let lines = &self.lines;
        vec![
            format!(
                "CREATE TABLE IF NOT EXISTS {orders} (
                    order_id   TEXT PRIMARY KEY,
                    client_id  TEXT NOT NULL REFERENCES clients (client_id),
                    date       DATE NOT NULL,
                    total_sum  NUMERIC NOT NULL CHECK (total_sum >= 0),
                    price_type TEXT NOT NULL DEFAULT '',
                    status     TEXT NOT NULL DEFAULT 'confirmed',
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                )"
            ),
            format!("CREATE INDEX IF NOT EXISTS idx_{orders}_client_id ON {orders} (client_id)"),
            format!("CREATE INDEX IF NOT EXISTS idx_{orders}_date ON {orders} (date)"),
            format!(
                "CREATE TABLE IF NOT EXISTS {lines} (
                    order_id     TEXT NOT NULL REFERENCES {orders} (order_id) ON DELETE CASCADE,
                    line_no      INTEGER NOT NULL CHECK (line_no > 0),
                    sku          TEXT REFERENCES items (sku),
                    product_name TEXT NOT NULL DEFAULT '',
                    qty          NUMERIC,
                    price        NUMERIC,
                    total        NUMERIC,
                    vat          NUMERIC,
                    selfcost     NUMERIC,
                    PRIMARY KEY (order_id, line_no)
                )"
            ),
            format!("CREATE INDEX IF NOT EXISTS idx_{lines}_sku ON {lines} (sku)"),
        ]
    }

    /// Create the order and line tables when they are missing.
    pub async fn ensure_tables(&self, pool: &PgPool) -> Result<(), sqlx::Error> {
        if self.is_default() {
            return Ok(());
        }
        let mut tx = pool.begin().await?;
        for statement in self.ddl() {
            sqlx::query(&statement).execute(&mut *tx).await?;
        }
        tx.commit().await?;
        tracing::info!(orders = %self.orders, lines = %self.lines, "Ensured sales tables");
        Ok(())
    }
}

impl Default for SalesSchema {
    fn default() -> Self {
        Self {
            orders: Self::DEFAULT_TABLE.to_string(),
            lines: format!("{}_items", Self::DEFAULT_TABLE),
        }
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    name.len() <= MAX_TABLE_LEN
        && (first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn default_schema_matches_migrations() {
        let schema = SalesSchema::default();
        assert_eq!(schema.orders(), "sales");
        assert_eq!(schema.lines(), "sales_items");
        assert!(schema.is_default());
        assert_eq!(SalesSchema::new("Sales").unwrap(), schema);
    }

    #[test]
    fn custom_table_derives_line_table() {
        let schema = SalesSchema::new("orders_2024").unwrap();
        assert_eq!(schema.lines(), "orders_2024_items");
        assert!(!schema.is_default());
        assert!(schema.ddl()[0].contains("CREATE TABLE IF NOT EXISTS orders_2024 "));
    }

    #[test]
    fn rejects_non_identifiers() {
        for bad in ["", "1sales", "sales; DROP TABLE clients", "sa-les", &"x".repeat(49)] {
            assert_matches!(SalesSchema::new(bad), Err(CoreError::Config(_)), "{bad}");
        }
    }
}
