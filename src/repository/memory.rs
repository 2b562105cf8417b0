//! In-process user directory for tests and local runs

use super::UserDirectory;
use crate::{
    clock::Clock,
    error::AppError,
    models::user::{NewUser, User},
};
use async_trait::async_trait;
use dashmap::{mapref::entry::Entry, DashMap};
use std::sync::Arc;
use uuid::Uuid;

/// `DashMap` 实现，邮箱索引的 entry 锁保证唯一性
pub struct InMemoryUserDirectory {
    users: DashMap<Uuid, User>,
    by_email: DashMap<String, Uuid>,
    clock: Arc<dyn Clock>,
}

impl InMemoryUserDirectory {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            users: DashMap::new(),
            by_email: DashMap::new(),
            clock,
        }
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn create(&self, user: NewUser) -> Result<User, AppError> {
        match self.by_email.entry(user.email.clone()) {
            Entry::Occupied(_) => Err(AppError::UserExists),
            Entry::Vacant(slot) => {
                let now = self.clock.now();
                let created = User {
                    id: Uuid::new_v4(),
                    email: user.email,
                    password_hash: user.password_hash,
                    first_name: user.first_name,
                    last_name: user.last_name,
                    active: true,
                    created_at: now,
                    updated_at: now,
                };
                self.users.insert(created.id, created.clone());
                slot.insert(created.id);
                Ok(created)
            }
        }
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let Some(id) = self.by_email.get(email).map(|id| *id) else {
            return Ok(None);
        };
        Ok(self.users.get(&id).map(|user| user.clone()))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.users.get(&id).map(|user| user.clone()))
    }

    async fn email_exists(&self, email: &str) -> Result<bool, AppError> {
        Ok(self.by_email.contains_key(email))
    }

    async fn deactivate(&self, id: Uuid) -> Result<bool, AppError> {
        let Some(mut user) = self.users.get_mut(&id) else {
            return Ok(false);
        };
        if !user.active {
            return Ok(false);
        }
        user.active = false;
        user.updated_at = self.clock.now();
        Ok(true)
    }
}
