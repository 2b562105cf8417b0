//! Refresh-token session store
//!
//! Holds the single currently-valid refresh token per user. Writing a new
//! token overwrites the previous one, which is what revokes older sessions.
//! Operations are atomic per key only; there is no transaction spanning the
//! store and the user directory.

mod memory;
mod redis_store;

pub use memory::InMemorySessionStore;
pub use redis_store::RedisSessionStore;

use crate::error::AppError;
use async_trait::async_trait;
use std::time::Duration;
use uuid::Uuid;

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Upsert the refresh token for `user_id`, expiring after `ttl`.
    async fn put(&self, user_id: Uuid, refresh_token: &str, ttl: Duration) -> Result<(), AppError>;

    /// Current refresh token for `user_id`, if any and not expired.
    async fn get(&self, user_id: Uuid) -> Result<Option<String>, AppError>;

    async fn delete(&self, user_id: Uuid) -> Result<(), AppError>;

    /// Connectivity probe for readiness checks.
    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}
