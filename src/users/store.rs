//! Persistence seam for users.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::users::model::User;

/// Errors a `UserStore` can report.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No live row with the requested identity.
    #[error("record not found")]
    NotFound,

    /// A unique field collided with an existing row.
    #[error("{0}")]
    Conflict(String),

    /// The database could not be reached or rejected the statement.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Fields written on update. `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserChanges {
    pub email: Option<String>,
    pub name: Option<String>,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create(&self, email: &str, name: &str) -> Result<User, StoreError>;

    async fn get_by_id(&self, id: Uuid) -> Result<User, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Users ordered by creation time, oldest first.
    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<User>, StoreError>;

    async fn update(&self, id: Uuid, changes: UserChanges) -> Result<User, StoreError>;

    async fn delete(&self, id: Uuid) -> Result<(), StoreError>;
}
