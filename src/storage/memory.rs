//! In-memory `UserStore` and `ConnectionPool`.
//!
//! Backs the test suite and `database.backend = "memory"` local runs.
//! Availability can be toggled to simulate an unreachable database.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::storage::ConnectionPool;
use crate::users::{StoreError, User, UserChanges, UserStore};

#[derive(Debug)]
pub struct MemoryUserStore {
    users: RwLock<Vec<User>>,
    available: AtomicBool,
    closed: AtomicBool,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self {
            users: RwLock::new(Vec::new()),
            available: AtomicBool::new(true),
            closed: AtomicBool::new(false),
        }
    }

    /// When unavailable, every store call and ping fails like a dead connection.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolClosed));
        }
        if !self.available.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<User>> {
        self.users.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Vec<User>> {
        self.users.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MemoryUserStore {
    fn default() -> Self {
        Self::new()
    }
}

fn conflict() -> StoreError {
    StoreError::Conflict("user with this email already exists".to_string())
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create(&self, email: &str, name: &str) -> Result<User, StoreError> {
        self.check()?;
        let mut users = self.write();
        if users.iter().any(|u| u.email == email) {
            return Err(conflict());
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            name: name.to_string(),
            created_at: now,
            updated_at: now,
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<User, StoreError> {
        self.check()?;
        self.read()
            .iter()
            .find(|u| u.id == id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.check()?;
        Ok(self.read().iter().find(|u| u.email == email).cloned())
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<User>, StoreError> {
        self.check()?;
        let skip = usize::try_from(offset).unwrap_or(0);
        let take = usize::try_from(limit).unwrap_or(0);
        Ok(self.read().iter().skip(skip).take(take).cloned().collect())
    }

    async fn update(&self, id: Uuid, changes: UserChanges) -> Result<User, StoreError> {
        self.check()?;
        let mut users = self.write();

        if let Some(email) = &changes.email {
            if users.iter().any(|u| &u.email == email && u.id != id) {
                return Err(conflict());
            }
        }

        let user = users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(StoreError::NotFound)?;
        if let Some(email) = changes.email {
            user.email = email;
        }
        if let Some(name) = changes.name {
            user.name = name;
        }
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        self.check()?;
        let mut users = self.write();
        let before = users.len();
        users.retain(|u| u.id != id);
        if users.len() == before {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl ConnectionPool for MemoryUserStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.check()
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn list_pages_in_insertion_order() {
        let store = MemoryUserStore::new();
        for i in 0..5 {
            store
                .create(&format!("user{i}@example.com"), &format!("User {i}"))
                .await
                .unwrap();
        }

        let page = store.list(2, 1).await.unwrap();
        let emails: Vec<_> = page.iter().map(|u| u.email.as_str()).collect();
        assert_eq!(emails, vec!["user1@example.com", "user2@example.com"]);
    }

    #[tokio::test]
    async fn unavailable_store_fails_calls() {
        let store = MemoryUserStore::new();
        store.set_available(false);
        assert!(matches!(
            store.list(10, 0).await,
            Err(StoreError::Database(_))
        ));
        assert!(store.ping().await.is_err());

        store.set_available(true);
        assert!(store.ping().await.is_ok());
    }

    #[tokio::test]
    async fn close_is_idempotent_and_final() {
        let store = MemoryUserStore::new();
        store.close().await.unwrap();
        store.close().await.unwrap();
        assert!(store.is_closed());
        assert!(store.ping().await.is_err());
    }
}
