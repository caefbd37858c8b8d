//! User records and request payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const NAME_MIN_CHARS: usize = 2;
const NAME_MAX_CHARS: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CreateUserRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
}

/// Partial update. Empty or absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct UpdateUserRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// One failed field constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl CreateUserRequest {
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();

        if self.email.trim().is_empty() {
            errors.push(FieldError::new("email", "is required"));
        } else if let Some(err) = check_email(&self.email) {
            errors.push(err);
        }

        if self.name.trim().is_empty() {
            errors.push(FieldError::new("name", "is required"));
        } else if let Some(err) = check_name(&self.name) {
            errors.push(err);
        }

        finish(errors)
    }
}

impl UpdateUserRequest {
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref().filter(|e| !e.is_empty())
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref().filter(|n| !n.is_empty())
    }

    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let errors = [
            self.email().and_then(check_email),
            self.name().and_then(check_name),
        ]
        .into_iter()
        .flatten()
        .collect();

        finish(errors)
    }
}

fn finish(errors: Vec<FieldError>) -> Result<(), Vec<FieldError>> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_email(email: &str) -> Option<FieldError> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    (!valid).then(|| FieldError::new("email", "must be a valid email address"))
}

fn check_name(name: &str) -> Option<FieldError> {
    let len = name.chars().count();
    (!(NAME_MIN_CHARS..=NAME_MAX_CHARS).contains(&len)).then(|| {
        FieldError::new(
            "name",
            format!(
                "must be between {} and {} characters",
                NAME_MIN_CHARS, NAME_MAX_CHARS
            ),
        )
    })
}
