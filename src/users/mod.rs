//! User resources.
//!
//! # Data Flow
//! ```text
//! handlers (http/handlers/users.rs)
//!     → service.rs (duplicate email check, pagination clamp, partial update merge)
//!     → store.rs (UserStore trait)
//!         → postgres.rs (PgUserStore, production)
//!         → storage::memory (MemoryUserStore, tests and local runs)
//! ```

pub mod model;
pub mod postgres;
pub mod service;
pub mod store;

pub use model::{CreateUserRequest, FieldError, UpdateUserRequest, User};
pub use service::{Page, UserService};
pub use store::{StoreError, UserChanges, UserStore};
