//! Periodic cleanup of generated report files.
//!
//! Deletes files under the output directory whose modification time is
//! older than the retention period. Runs once at startup and then on a
//! fixed interval until cancelled.

use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tokio_util::sync::CancellationToken;

const SECS_PER_DAY: u64 = 24 * 60 * 60;

/// Age after which a report file is swept. Saturates for absurd day counts.
pub fn max_age(retention_days: u64) -> Duration {
    Duration::from_secs(retention_days.saturating_mul(SECS_PER_DAY))
}

/// Remove every file under `dir` (recursively) last modified more than
/// `max_age` ago. A missing directory counts as empty.
pub fn sweep(dir: &Path, max_age: Duration) -> io::Result<usize> {
    if !dir.exists() {
        return Ok(0);
    }
    let cutoff = SystemTime::now()
        .checked_sub(max_age)
        .unwrap_or(SystemTime::UNIX_EPOCH);

    let mut removed = 0;
    let mut pending: Vec<PathBuf> = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        for entry in std::fs::read_dir(&current)? {
            let entry = entry?;
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                pending.push(entry.path());
                continue;
            }
            if !file_type.is_file() {
                continue;
            }
            let modified = entry.metadata()?.modified()?;
            if modified <= cutoff {
                let path = entry.path();
                match std::fs::remove_file(&path) {
                    Ok(()) => removed += 1,
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "Could not remove old report")
                    }
                }
            }
        }
    }
    Ok(removed)
}

/// Run the report retention loop until `cancel` is triggered.
pub async fn run(out_dir: PathBuf, retention_days: u64, every: Duration, cancel: CancellationToken) {
    let age = max_age(retention_days);
    tracing::info!(
        dir = %out_dir.display(),
        retention_days,
        interval_secs = every.as_secs(),
        "Report retention job started"
    );

    let mut interval = tokio::time::interval(every);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Report retention job stopping");
                break;
            }
            _ = interval.tick() => {
                let dir = out_dir.clone();
                match tokio::task::spawn_blocking(move || sweep(&dir, age)).await {
                    Ok(Ok(0)) => tracing::debug!("Report retention: nothing to remove"),
                    Ok(Ok(removed)) => tracing::info!(removed, "Report retention: removed old files"),
                    Ok(Err(e)) => tracing::error!(error = %e, "Report retention: sweep failed"),
                    Err(e) => tracing::error!(error = %e, "Report retention: task panicked"),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs::File;

    use super::*;

    #[test]
    fn missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(sweep(&dir.path().join("nope"), Duration::ZERO).unwrap(), 0);
    }

    #[test]
    fn removes_only_expired_files_recursively() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("abc_clients");
        std::fs::create_dir_all(&nested).unwrap();

        let old = nested.join("abc_clients_20240101_0900.xlsx");
        let fresh = nested.join("abc_clients_20240301_0900.xlsx");
        File::create(&old).unwrap();
        File::create(&fresh).unwrap();

        let sixty_one_days = Duration::from_secs(61 * 24 * 60 * 60);
        File::options()
            .write(true)
            .open(&old)
            .unwrap()
            .set_modified(SystemTime::now() - sixty_one_days)
            .unwrap();

        let removed = sweep(dir.path(), Duration::from_secs(60 * 24 * 60 * 60)).unwrap();
        assert_eq!(removed, 1);
        assert!(!old.exists());
        assert!(fresh.exists());
        assert!(nested.exists());
    }

    #[test]
    fn max_age_saturates() {
        assert_eq!(max_age(60), Duration::from_secs(60 * SECS_PER_DAY));
        assert_eq!(max_age(u64::MAX), Duration::from_secs(u64::MAX));

        // A cutoff before the epoch keeps everything.
        let dir = tempfile::tempdir().unwrap();
        File::create(dir.path().join("report.xlsx")).unwrap();
        assert_eq!(sweep(dir.path(), max_age(u64::MAX)).unwrap(), 0);
    }

    #[tokio::test]
    async fn loop_stops_on_cancel() {
        let dir = tempfile::tempdir().unwrap();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run(
            dir.path().to_path_buf(),
            60,
            Duration::from_secs(3600),
            cancel.clone(),
        ));
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
