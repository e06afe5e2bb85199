use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// User record as held by the store.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,                      // store-assigned, monotonic
    pub email: String,                // unique across live records
    #[serde(skip_serializing)]
    pub password_hash: String,        // argon2 PHC string, not exposed in JSON
    #[serde(skip_serializing)]
    pub session_id: Option<String>,   // present iff a session is active
    #[serde(skip_serializing)]
    pub reset_token: Option<String>,  // present iff a reset is pending
}

/// Closed set of lookup keys. Anything outside this enum cannot be queried,
/// so an unsupported-field lookup is rejected at compile time.
#[derive(Debug, Clone, Copy)]
pub enum UserQuery<'a> {
    Id(i64),
    Email(&'a str),
    SessionId(&'a str),
    ResetToken(&'a str),
}

/// Field updates for the two mutable columns. `email` and `password_hash`
/// are immutable after creation and deliberately have no entry here.
///
/// The outer `Option` means "touch this field"; the inner one is the new
/// value, with `None` clearing it.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub session_id: Option<Option<String>>,
    pub reset_token: Option<Option<String>>,
}

impl UserUpdate {
    pub fn session_id(mut self, value: Option<String>) -> Self {
        self.session_id = Some(value);
        self
    }

    pub fn reset_token(mut self, value: Option<String>) -> Self {
        self.reset_token = Some(value);
        self
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("email already registered")]
    DuplicateEmail,

    #[error("no matching user")]
    NotFound,

    #[error("user store unavailable")]
    Unavailable(#[source] anyhow::Error),
}

/// Narrow persistence contract for user records. The backing engine is
/// swappable as long as it keeps email uniqueness and serializes
/// read-modify-write updates to a given record.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new record with a fresh id and no tokens. Duplicate-email
    /// detection is the store's job, not a caller pre-check.
    async fn add_user(&self, email: &str, password_hash: &str) -> Result<User, StoreError>;

    /// Return the unique record matching the query, or `NotFound`.
    async fn find_user_by(&self, query: UserQuery<'_>) -> Result<User, StoreError>;

    /// Apply the given field updates atomically to the record with this id.
    async fn update_user(&self, id: i64, update: UserUpdate) -> Result<(), StoreError>;
}
