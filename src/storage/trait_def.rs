use crate::analytics::{PageViewRecord, SessionRecord, Window};
use crate::models::{NewPageView, NewSession, NewVisitor, Role, Setting, User};
use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("email already in use")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

#[async_trait]
pub trait Storage: Send + Sync {
    /// Initialize the storage (create tables and indexes)
    async fn init(&self) -> Result<()>;

    /// Create a user; fails with `Conflict` when the email is taken
    async fn create_user(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
        role: Role,
    ) -> StorageResult<User>;

    async fn get_user(&self, id: i64) -> Result<Option<User>>;

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;

    /// All users, oldest first
    async fn list_users(&self) -> Result<Vec<User>>;

    /// Change name and email; `Conflict` when another user owns the email
    async fn update_profile(&self, id: i64, name: &str, email: &str) -> StorageResult<User>;

    /// Returns false when the user does not exist
    async fn update_password(&self, id: i64, password_hash: &str) -> Result<bool>;

    /// Returns false when the user does not exist
    async fn update_role(&self, id: i64, role: Role) -> Result<bool>;

    /// All settings ordered by key
    async fn list_settings(&self) -> Result<Vec<Setting>>;

    /// Update an existing setting by id, recording who changed it
    async fn update_setting(
        &self,
        id: i64,
        value: &str,
        updated_by: Option<i64>,
    ) -> StorageResult<Setting>;

    /// Create or overwrite a setting by key
    async fn upsert_setting(&self, key: &str, value: &str, updated_by: Option<i64>)
        -> Result<Setting>;

    /// Sessions that started inside the window, with visitor attributes and
    /// page view counts, oldest first
    async fn sessions_between(&self, window: &Window) -> Result<Vec<SessionRecord>>;

    /// Page views created inside the window, oldest first
    async fn page_views_between(&self, window: &Window) -> Result<Vec<PageViewRecord>>;

    async fn count_page_views_between(&self, window: &Window) -> Result<u64>;

    /// Insert visitors in one transaction, returning their ids in input order
    async fn insert_visitors(&self, visitors: &[NewVisitor]) -> Result<Vec<i64>>;

    /// Insert sessions in one transaction, returning their ids in input order
    async fn insert_sessions(&self, sessions: &[NewSession]) -> Result<Vec<i64>>;

    /// Insert page views in one transaction
    async fn insert_page_views(&self, page_views: &[NewPageView]) -> Result<()>;

    /// Remove all visitors, sessions and page views
    async fn clear_analytics(&self) -> Result<()>;
}
