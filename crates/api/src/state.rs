use std::sync::Arc;

use salesbot_core::error::CoreError;
use salesbot_db::SalesSchema;
use tokio::sync::Mutex;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; everything inside is behind `Arc` or already `Clone`.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: salesbot_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// Validated order and line table names.
    pub schema: SalesSchema,
    /// Held for the whole write phase so batches apply one after another.
    pub write_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(pool: salesbot_db::DbPool, config: ServerConfig) -> Result<Self, CoreError> {
        let schema = SalesSchema::new(&config.table)?;
        Ok(Self {
            pool,
            config: Arc::new(config),
            schema,
            write_lock: Arc::new(Mutex::new(())),
        })
    }
}
