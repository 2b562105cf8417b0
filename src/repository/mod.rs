//! User directory (数据访问层)
//! 用户记录的持久化抽象：PostgreSQL 实现与进程内测试替身

pub mod memory;
pub mod user_repo;

pub use memory::InMemoryUserDirectory;
pub use user_repo::PgUserDirectory;

use crate::{
    error::AppError,
    models::user::{NewUser, User},
};
use async_trait::async_trait;
use uuid::Uuid;

/// 用户目录契约
///
/// 邮箱唯一性由目录保证：`create` 遇到重复邮箱返回 `AppError::UserExists`。
/// 查询返回包括已停用用户在内的原始记录，是否可用由调用方判断。
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn create(&self, user: NewUser) -> Result<User, AppError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError>;

    async fn email_exists(&self, email: &str) -> Result<bool, AppError>;

    /// 软删除：置 active = false，返回是否命中
    async fn deactivate(&self, id: Uuid) -> Result<bool, AppError>;

    /// 连通性探测
    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}
