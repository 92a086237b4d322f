//! Postgres persistence for sales data.
//!
//! Holds the connection pool helpers, the row models and repositories, the
//! transactional executor for [`salesbot_core::batch::UpsertPlan`] and the
//! [`PgSalesSource`] reports read from.

use sqlx::postgres::PgPoolOptions;

pub mod models;
pub mod repositories;
pub mod schema;
pub mod source;
pub mod upsert;

pub use schema::SalesSchema;
pub use source::PgSalesSource;
pub use upsert::{apply_plan, ingest, UpsertSummary};

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await
}

/// Round-trip a trivial query to prove the pool can reach the server.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply the embedded migrations from `db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../db/migrations").run(pool).await
}
