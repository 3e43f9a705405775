// Moka cache for login sessions

use crate::api::SessionStore;
use crate::auth::session::Session;
use crate::core::errors::AdminError;
use async_trait::async_trait;
use moka::future::Cache;
use moka::ops::compute::{CompResult, Op};
use std::time::Duration;

/// Moka-based session store
///
/// Sessions expire after `idle_ttl` without a request. Sessions are
/// process-local, so a restart logs everyone out.
pub struct MokaSessionStore {
    cache: Cache<String, Session>,
}

impl MokaSessionStore {
    /// # Parameters
    /// * `idle_ttl` - Time a session survives without being used
    /// * `max_capacity` - Maximum number of live sessions
    pub fn new(idle_ttl: Duration, max_capacity: u64) -> Self {
        let cache = Cache::builder()
            .time_to_idle(idle_ttl)
            .max_capacity(max_capacity)
            .build();

        Self { cache }
    }
}

#[async_trait]
impl SessionStore for MokaSessionStore {
    async fn load(&self, session_id: &str) -> Result<Option<Session>, AdminError> {
        Ok(self.cache.get(session_id).await)
    }

    async fn save(&self, session: Session) -> Result<(), AdminError> {
        self.cache.insert(session.id.clone(), session).await;
        Ok(())
    }

    async fn update(&self, session: Session) -> Result<bool, AdminError> {
        let result = self
            .cache
            .entry(session.id.clone())
            .and_compute_with(|entry| {
                let op = match entry {
                    Some(_) => Op::Put(session),
                    None => Op::Nop,
                };
                std::future::ready(op)
            })
            .await;
        Ok(matches!(result, CompResult::ReplacedWith(_)))
    }

    async fn remove(&self, session_id: &str) -> Result<(), AdminError> {
        self.cache.invalidate(session_id).await;
        Ok(())
    }
}
