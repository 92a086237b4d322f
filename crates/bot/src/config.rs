use std::collections::HashSet;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use salesbot_core::error::CoreError;
use salesbot_core::source::Backend;

/// Bot configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub token: String,
    /// Bot API root; overridable for local API servers.
    pub api_url: String,
    /// Empty means everyone is allowed.
    pub allowed_user_ids: HashSet<i64>,
    pub backend: Backend,
    pub json_path: PathBuf,
    pub database_url: Option<String>,
    pub table: String,
    pub out_dir: PathBuf,
    pub voice_webhook_url: Option<String>,
    pub session_ttl: Duration,
    pub report_timeout: Duration,
    pub retention_days: u64,
    pub retention_interval: Duration,
    pub poll_timeout_secs: u64,
}

impl BotConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                   | Default                    |
    /// |---------------------------|----------------------------|
    /// | `TELEGRAM_BOT_TOKEN`      | required                   |
    /// | `TELEGRAM_API_URL`        | `https://api.telegram.org` |
    /// | `BOT_ALLOWED_USER_IDS`    | empty (allow all)          |
    /// | `DATA_BACKEND`            | `json`                     |
    /// | `SALES_JSON_PATH`         | `data/sales.json`          |
    /// | `DATABASE_URL` / `PG_DSN` | unset                      |
    /// | `PG_TABLE`                | `sales`                    |
    /// | `OUT_DIR`                 | `out`                      |
    /// | `VOICE_WEBHOOK_URL`       | unset (voice disabled)     |
    /// | `SESSION_TTL_SECS`        | `3600`                     |
    /// | `REPORT_TIMEOUT_SECS`     | `300`                      |
    /// | `RETENTION_DAYS`          | `60`                       |
    /// | `RETENTION_INTERVAL_SECS` | `86400`                    |
    /// | `POLL_TIMEOUT_SECS`       | `30`                       |
    pub fn from_env() -> Result<Self, CoreError> {
        let token = non_empty("TELEGRAM_BOT_TOKEN")
            .ok_or_else(|| CoreError::Config("TELEGRAM_BOT_TOKEN must be set".into()))?;

        Ok(Self {
            token,
            api_url: non_empty("TELEGRAM_API_URL")
                .unwrap_or_else(|| "https://api.telegram.org".into()),
            allowed_user_ids: parse_allowed_ids(&non_empty("BOT_ALLOWED_USER_IDS").unwrap_or_default())?,
            backend: Backend::from_str(&non_empty("DATA_BACKEND").unwrap_or_else(|| "json".into()))?,
            json_path: non_empty("SALES_JSON_PATH")
                .unwrap_or_else(|| "data/sales.json".into())
                .into(),
            database_url: non_empty("DATABASE_URL").or_else(|| non_empty("PG_DSN")),
            table: non_empty("PG_TABLE").unwrap_or_else(|| "sales".into()),
            out_dir: non_empty("OUT_DIR").unwrap_or_else(|| "out".into()).into(),
            voice_webhook_url: non_empty("VOICE_WEBHOOK_URL"),
            session_ttl: Duration::from_secs(parse_or("SESSION_TTL_SECS", 3600)?),
            report_timeout: Duration::from_secs(parse_or("REPORT_TIMEOUT_SECS", 300)?),
            retention_days: parse_or("RETENTION_DAYS", 60)?,
            retention_interval: Duration::from_secs(parse_or("RETENTION_INTERVAL_SECS", 86_400)?),
            poll_timeout_secs: parse_or("POLL_TIMEOUT_SECS", 30)?,
        })
    }

    pub fn is_allowed(&self, user_id: i64) -> bool {
        self.allowed_user_ids.is_empty() || self.allowed_user_ids.contains(&user_id)
    }
}

fn non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_or(key: &str, default: u64) -> Result<u64, CoreError> {
    match non_empty(key) {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|_| CoreError::Config(format!("{key} must be a non-negative integer, got '{raw}'"))),
    }
}

/// Comma-separated Telegram user ids; blanks are ignored.
pub fn parse_allowed_ids(raw: &str) -> Result<HashSet<i64>, CoreError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>()
                .map_err(|_| CoreError::Config(format!("BOT_ALLOWED_USER_IDS: '{s}' is not a user id")))
        })
        .collect()
}
