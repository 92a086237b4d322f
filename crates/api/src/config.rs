use std::path::PathBuf;

use salesbot_db::SalesSchema;

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `8000`).
    pub port: u16,
    /// HTTP request timeout in seconds (default: `120`).
    pub request_timeout_secs: u64,
    /// Maximum accepted request body in bytes (default: 10 MiB).
    pub body_limit_bytes: usize,
    /// Where raw batches are copied after a successful update.
    pub backup_dir: PathBuf,
    /// Orders table name (default: `sales`).
    pub table: String,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default          |
    /// |------------------------|------------------|
    /// | `HOST`                 | `0.0.0.0`        |
    /// | `PORT`                 | `8000`           |
    /// | `REQUEST_TIMEOUT_SECS` | `120`            |
    /// | `BODY_LIMIT_BYTES`     | `10485760`       |
    /// | `BACKUP_DIR`           | `data/backups`   |
    /// | `PG_TABLE`             | `sales`          |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "8000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "120".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let body_limit_bytes: usize = std::env::var("BODY_LIMIT_BYTES")
            .unwrap_or_else(|_| (10 * 1024 * 1024).to_string())
            .parse()
            .expect("BODY_LIMIT_BYTES must be a valid usize");

        let backup_dir = std::env::var("BACKUP_DIR")
            .unwrap_or_else(|_| "data/backups".into())
            .into();

        let table =
            std::env::var("PG_TABLE").unwrap_or_else(|_| SalesSchema::DEFAULT_TABLE.into());

        Self {
            host,
            port,
            request_timeout_secs,
            body_limit_bytes,
            backup_dir,
            table,
        }
    }
}
