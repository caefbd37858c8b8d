//! Postgres-backed `UserStore`.
//!
//! Expects a `users` table:
//! `id uuid primary key, email text unique, name text, created_at timestamptz,
//! updated_at timestamptz, deleted_at timestamptz null`. Deletes are soft:
//! every read filters `deleted_at IS NULL`.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::users::model::User;
use crate::users::store::{StoreError, UserChanges, UserStore};

const UNIQUE_VIOLATION: &str = "23505";

const COLUMNS: &str = "id, email, name, created_at, updated_at";

#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_write_error(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
            StoreError::Conflict("user with this email already exists".to_string())
        }
        _ => StoreError::Database(err),
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create(&self, email: &str, name: &str) -> Result<User, StoreError> {
        let sql = format!(
            "INSERT INTO users (id, email, name, created_at, updated_at) \
             VALUES ($1, $2, $3, now(), now()) RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(Uuid::new_v4())
            .bind(email)
            .bind(name)
            .fetch_one(&self.pool)
            .await
            .map_err(map_write_error)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<User, StoreError> {
        let sql = format!("SELECT {COLUMNS} FROM users WHERE id = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let sql =
            format!("SELECT {COLUMNS} FROM users WHERE email = $1 AND deleted_at IS NULL");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<User>, StoreError> {
        let sql = format!(
            "SELECT {COLUMNS} FROM users WHERE deleted_at IS NULL \
             ORDER BY created_at, id LIMIT $1 OFFSET $2"
        );
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn update(&self, id: Uuid, changes: UserChanges) -> Result<User, StoreError> {
        let sql = format!(
            "UPDATE users SET email = COALESCE($2, email), name = COALESCE($3, name), \
             updated_at = now() WHERE id = $1 AND deleted_at IS NULL RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(changes.email)
            .bind(changes.name)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_write_error)?
            .ok_or(StoreError::NotFound)
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE users SET deleted_at = now() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
