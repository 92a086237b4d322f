//! Per-user parameter selections.
//!
//! A session remembers which report a user is configuring and the raw
//! values picked so far. Sessions expire after a period of inactivity; an
//! expired or mismatched session is re-seeded from the report's presets.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use salesbot_core::params::RawParams;
use serde_json::Value;
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
struct Session {
    slug: String,
    params: RawParams,
    touched: Instant,
}

pub struct SessionStore {
    ttl: Duration,
    sessions: Mutex<HashMap<i64, Session>>,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    fn is_live(&self, session: &Session) -> bool {
        session.touched.elapsed() < self.ttl
    }

    /// Begin (or restart) configuring `slug` with `defaults`.
    pub async fn start(&self, user_id: i64, slug: &str, defaults: RawParams) -> RawParams {
        let session = Session {
            slug: slug.to_string(),
            params: defaults,
            touched: Instant::now(),
        };
        let params = session.params.clone();
        self.sessions.lock().await.insert(user_id, session);
        params
    }

    /// Record one value. Re-seeds from `defaults` when the user has no live
    /// session for `slug`.
    pub async fn set(
        &self,
        user_id: i64,
        slug: &str,
        key: &str,
        value: Value,
        defaults: impl Fn() -> RawParams,
    ) -> RawParams {
        let ttl = self.ttl;
        let mut sessions = self.sessions.lock().await;
        let session = sessions
            .entry(user_id)
            .and_modify(|s| {
                if s.slug != slug || s.touched.elapsed() >= ttl {
                    s.slug = slug.to_string();
                    s.params = defaults();
                }
            })
            .or_insert_with(|| Session {
                slug: slug.to_string(),
                params: defaults(),
                touched: Instant::now(),
            });
        session.params.insert(key.to_string(), value);
        session.touched = Instant::now();
        session.params.clone()
    }

    /// Current selection for `slug`, if the user has a live session for it.
    pub async fn params(&self, user_id: i64, slug: &str) -> Option<RawParams> {
        let sessions = self.sessions.lock().await;
        sessions
            .get(&user_id)
            .filter(|s| s.slug == slug && self.is_live(s))
            .map(|s| s.params.clone())
    }

    /// Drop expired sessions; returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.touched.elapsed() < self.ttl);
        before - sessions.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn defaults() -> RawParams {
        RawParams::from([("dim".to_string(), json!("overall"))])
    }

    #[tokio::test]
    async fn set_updates_live_session() {
        let store = SessionStore::new(Duration::from_secs(3600));
        store.start(1, "average_check", defaults()).await;
        let params = store
            .set(1, "average_check", "period_days", json!(30), RawParams::new)
            .await;
        assert_eq!(params.get("dim"), Some(&json!("overall")));
        assert_eq!(params.get("period_days"), Some(&json!(30)));
        assert_eq!(store.params(1, "average_check").await, Some(params));
    }

    #[tokio::test]
    async fn switching_report_reseeds() {
        let store = SessionStore::new(Duration::from_secs(3600));
        store.start(1, "average_check", defaults()).await;
        let params = store
            .set(1, "abc_clients", "period_days", json!(15), RawParams::new)
            .await;
        assert_eq!(params.len(), 1);
        assert!(store.params(1, "average_check").await.is_none());
    }

    #[tokio::test]
    async fn users_are_isolated() {
        let store = SessionStore::new(Duration::from_secs(3600));
        store.start(1, "average_check", defaults()).await;
        assert!(store.params(2, "average_check").await.is_none());
    }

    #[tokio::test]
    async fn expired_sessions_are_ignored_and_purged() {
        let store = SessionStore::new(Duration::ZERO);
        store.start(1, "average_check", defaults()).await;
        assert!(store.params(1, "average_check").await.is_none());

        let params = store
            .set(1, "average_check", "dim", json!("client"), defaults)
            .await;
        assert_eq!(params.get("dim"), Some(&json!("client")));

        assert_eq!(store.purge_expired().await, 1);
        assert_eq!(store.len().await, 0);
    }
}
