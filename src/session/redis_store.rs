//! Redis-backed session store

use super::SessionStore;
use crate::{config::RedisConfig, error::AppError};
use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands};
use secrecy::ExposeSecret;
use std::time::Duration;
use uuid::Uuid;

/// Stores `{prefix}:{user_id} -> refresh_token` with `SET .. EX ttl`.
///
/// `ConnectionManager` reconnects on its own; each call works on a cheap clone.
#[derive(Clone)]
pub struct RedisSessionStore {
    conn: ConnectionManager,
    key_prefix: String,
}

impl RedisSessionStore {
    pub fn new(conn: ConnectionManager, key_prefix: impl Into<String>) -> Self {
        Self {
            conn,
            key_prefix: key_prefix.into(),
        }
    }

    /// Open a managed connection from config
    pub async fn connect(config: &RedisConfig) -> Result<Self, AppError> {
        let client = redis::Client::open(config.url.expose_secret().as_str()).map_err(|e| {
            tracing::error!("Invalid Redis URL: {}", e);
            AppError::Config(format!("Invalid Redis URL: {}", e))
        })?;

        let conn = ConnectionManager::new(client).await.map_err(|e| {
            tracing::error!("Failed to connect to Redis: {}", e);
            AppError::SessionStore(e.to_string())
        })?;

        tracing::info!(key_prefix = %config.key_prefix, "Redis session store connected");

        Ok(Self::new(conn, config.key_prefix.clone()))
    }

    fn key(&self, user_id: Uuid) -> String {
        format!("{}:{}", self.key_prefix, user_id)
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn put(&self, user_id: Uuid, refresh_token: &str, ttl: Duration) -> Result<(), AppError> {
        let mut conn = self.conn.clone();
        // EX 0 is rejected by Redis
        let seconds = ttl.as_secs().max(1);

        let _: () = conn.set_ex(self.key(user_id), refresh_token, seconds).await?;
        Ok(())
    }

    async fn get(&self, user_id: Uuid) -> Result<Option<String>, AppError> {
        let mut conn = self.conn.clone();
        let token: Option<String> = conn.get(self.key(user_id)).await?;
        Ok(token)
    }

    async fn delete(&self, user_id: Uuid) -> Result<(), AppError> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(self.key(user_id)).await?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), AppError> {
        let mut conn = self.conn.clone();
        let _pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::Secret;

    fn test_config() -> RedisConfig {
        RedisConfig {
            url: Secret::new(
                std::env::var("TEST_REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            ),
            key_prefix: format!("refresh_token_test_{}", Uuid::new_v4()),
        }
    }

    #[tokio::test]
    async fn test_invalid_url_is_config_error() {
        let config = RedisConfig {
            url: Secret::new("not a url".to_string()),
            key_prefix: "refresh_token".to_string(),
        };
        assert!(matches!(
            RedisSessionStore::connect(&config).await,
            Err(AppError::Config(_))
        ));
    }

    #[tokio::test]
    #[ignore] // 需要 Redis
    async fn test_put_get_overwrite_delete() {
        let store = RedisSessionStore::connect(&test_config()).await.unwrap();
        let user_id = Uuid::new_v4();

        store.put(user_id, "first", Duration::from_secs(60)).await.unwrap();
        store.put(user_id, "second", Duration::from_secs(60)).await.unwrap();
        assert_eq!(store.get(user_id).await.unwrap().as_deref(), Some("second"));

        store.delete(user_id).await.unwrap();
        assert_eq!(store.get(user_id).await.unwrap(), None);
        store.ping().await.unwrap();
    }
}
