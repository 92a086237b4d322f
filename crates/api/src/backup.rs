//! Raw batch backups written after a successful update.

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde_json::Value;

/// `<dir>/sales_backup_<YYYYmmdd_HHMMSS>.json`.
pub fn backup_path(dir: &Path, at: NaiveDateTime) -> PathBuf {
    dir.join(format!("sales_backup_{}.json", at.format("%Y%m%d_%H%M%S")))
}

/// Write the batch exactly as received. Failures are logged and swallowed;
/// the batch is already committed by the time this runs.
pub async fn save_backup(dir: &Path, batch: &Value, at: NaiveDateTime) -> Option<PathBuf> {
    let path = backup_path(dir, at);
    let result = async {
        tokio::fs::create_dir_all(dir).await?;
        let bytes = serde_json::to_vec_pretty(batch).map_err(std::io::Error::other)?;
        tokio::fs::write(&path, bytes).await
    }
    .await;

    match result {
        Ok(()) => {
            tracing::info!(path = %path.display(), "Saved batch backup");
            Some(path)
        }
        Err(e) => {
            tracing::warn!(error = %e, dir = %dir.display(), "Failed to save batch backup");
            None
        }
    }
}
