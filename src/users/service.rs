//! Business rules layered over a `UserStore`.

use std::sync::Arc;

use uuid::Uuid;

use crate::users::model::{CreateUserRequest, UpdateUserRequest, User};
use crate::users::store::{StoreError, UserChanges, UserStore};

pub const DEFAULT_LIMIT: i64 = 10;
pub const DEFAULT_OFFSET: i64 = 0;

/// A clamped page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Page {
    /// Out-of-range values fall back to the defaults instead of failing.
    pub fn clamped(limit: Option<i64>, offset: Option<i64>) -> Self {
        Self {
            limit: limit.filter(|l| *l > 0).unwrap_or(DEFAULT_LIMIT),
            offset: offset.filter(|o| *o >= 0).unwrap_or(DEFAULT_OFFSET),
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::clamped(None, None)
    }
}

#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn UserStore>,
}

impl UserService {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    pub async fn create(&self, req: &CreateUserRequest) -> Result<User, StoreError> {
        if self.store.find_by_email(&req.email).await?.is_some() {
            return Err(StoreError::Conflict(
                "user with this email already exists".to_string(),
            ));
        }
        self.store.create(&req.email, &req.name).await
    }

    pub async fn get(&self, id: Uuid) -> Result<User, StoreError> {
        self.store.get_by_id(id).await
    }

    pub async fn list(&self, page: Page) -> Result<Vec<User>, StoreError> {
        self.store.list(page.limit, page.offset).await
    }

    pub async fn update(&self, id: Uuid, req: &UpdateUserRequest) -> Result<User, StoreError> {
        let current = self.store.get_by_id(id).await?;

        let email = req.email().filter(|e| *e != current.email);
        if let Some(email) = email {
            if let Some(owner) = self.store.find_by_email(email).await? {
                if owner.id != id {
                    return Err(StoreError::Conflict(
                        "user with this email already exists".to_string(),
                    ));
                }
            }
        }

        let changes = UserChanges {
            email: email.map(str::to_string),
            name: req.name().map(str::to_string),
        };
        self.store.update(id, changes).await
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        self.store.get_by_id(id).await?;
        self.store.delete(id).await
    }
}
