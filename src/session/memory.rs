//! In-process session store, test double for `RedisSessionStore`

use super::SessionStore;
use crate::{clock::Clock, error::AppError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

struct Entry {
    token: String,
    expires_at: DateTime<Utc>,
}

/// `DashMap`-backed store honoring TTLs against the shared clock.
pub struct InMemorySessionStore {
    entries: DashMap<Uuid, Entry>,
    clock: Arc<dyn Clock>,
}

impl InMemorySessionStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
        }
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn put(&self, user_id: Uuid, refresh_token: &str, ttl: Duration) -> Result<(), AppError> {
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|_| AppError::Internal("Session TTL out of range".to_string()))?;

        self.entries.insert(
            user_id,
            Entry {
                token: refresh_token.to_string(),
                expires_at: self.clock.now() + ttl,
            },
        );
        Ok(())
    }

    async fn get(&self, user_id: Uuid) -> Result<Option<String>, AppError> {
        let now = self.clock.now();
        // Expired entries are dropped lazily
        let removed = self
            .entries
            .remove_if(&user_id, |_, entry| entry.expires_at <= now);
        if removed.is_some() {
            return Ok(None);
        }

        Ok(self.entries.get(&user_id).map(|entry| entry.token.clone()))
    }

    async fn delete(&self, user_id: Uuid) -> Result<(), AppError> {
        self.entries.remove(&user_id);
        Ok(())
    }
}
