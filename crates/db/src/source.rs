//! Report data source backed by the Postgres sales tables.

use async_trait::async_trait;
use chrono::NaiveDate;
use salesbot_core::error::CoreError;
use salesbot_core::sales::{ItemSale, Order};
use salesbot_core::source::SalesSource;

use crate::repositories::{LineItemRepo, OrderRepo};
use crate::schema::SalesSchema;
use crate::DbPool;

#[derive(Clone)]
pub struct PgSalesSource {
    pool: DbPool,
    schema: SalesSchema,
}

impl PgSalesSource {
    pub fn new(pool: DbPool, schema: SalesSchema) -> Self {
        Self { pool, schema }
    }

    /// Connect with a DSN. An empty DSN is a configuration error.
    pub async fn connect(dsn: &str, schema: SalesSchema) -> Result<Self, CoreError> {
        if dsn.trim().is_empty() {
            return Err(CoreError::Config(
                "postgres backend requires a connection string (DATABASE_URL or PG_DSN)".into(),
            ));
        }
        let pool = crate::create_pool(dsn).await.map_err(transport)?;
        Ok(Self::new(pool, schema))
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

fn transport(e: sqlx::Error) -> CoreError {
    CoreError::Transport(format!("postgres: {e}"))
}

#[async_trait]
impl SalesSource for PgSalesSource {
    async fn load_orders(&self, since: Option<NaiveDate>) -> Result<Vec<Order>, CoreError> {
        let rows = OrderRepo::list_since(&self.pool, &self.schema, since)
            .await
            .map_err(transport)?;
        tracing::debug!(count = rows.len(), ?since, "Loaded orders from postgres");
        Ok(rows.into_iter().map(Order::from).collect())
    }

    async fn load_item_sales(&self, since: Option<NaiveDate>) -> Result<Vec<ItemSale>, CoreError> {
        let rows = LineItemRepo::list_item_sales_since(&self.pool, &self.schema, since)
            .await
            .map_err(transport)?;
        tracing::debug!(count = rows.len(), ?since, "Loaded item sales from postgres");
        Ok(rows.into_iter().map(ItemSale::from).collect())
    }
}
