//! User persistence.
//!
//! Handlers only see [`UserRepository`]; the process picks a backend at
//! startup (in-memory by default, Redis when a URL is configured).
//! Filtering, sorting and paging live in [`query`] and run on top of
//! `find_all`, so both backends answer searches identically.

pub mod memory;
pub mod query;
pub mod redis;
pub mod reports;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use memory::InMemoryUserRepository;
pub use query::{Page, PageRequest, SortDirection, SortField, UserFilter};
pub use self::redis::RedisUserRepository;

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("User not found with id: {0}")]
    NotFound(u64),

    #[error("User with email {0} already exists")]
    DuplicateEmail(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Corrupt record for user {id}: {reason}")]
    Corrupt { id: u64, reason: String },
}

impl From<::redis::RedisError> for StoreError {
    fn from(err: ::redis::RedisError) -> Self {
        StoreError::Backend(err.to_string())
    }
}

// ─── Domain types ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: u64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub age: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Field values for a create or a full update. Already passed basic
/// field validation.
#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub age: Option<i32>,
}

// ─── Repository ──────────────────────────────────────────────────

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Stores a new user and assigns its id.
    /// Fails with `DuplicateEmail` if the email is taken.
    async fn insert(&self, user: NewUser, created_at: DateTime<Utc>) -> Result<User>;

    async fn find_by_id(&self, id: u64) -> Result<Option<User>>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Replaces every editable field, keeps `created_at`, refreshes
    /// `updated_at`.
    async fn update(&self, id: u64, user: NewUser) -> Result<User>;

    async fn delete(&self, id: u64) -> Result<()>;

    /// Every user, newest first.
    async fn find_all(&self) -> Result<Vec<User>>;

    async fn count(&self) -> Result<u64>;

    async fn exists_by_email(&self, email: &str) -> Result<bool> {
        Ok(self.find_by_email(email).await?.is_some())
    }
}

/// Newest first, ties broken by id so the order is total.
pub(crate) fn sort_newest_first(users: &mut [User]) {
    users.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
}
