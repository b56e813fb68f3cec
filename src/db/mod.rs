//! User persistence layer.
//!
//! `UserStore` is the seam between the auth services and storage. The
//! production backend is Firestore; an in-memory backend exists for tests
//! and local development without GCP credentials.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreUserStore;
pub use memory::MemoryUserStore;

use crate::error::AppError;
use crate::models::User;
use async_trait::async_trait;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
}

/// Storage failures surfaced to the services.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A user with this email already exists. On create this means a
    /// concurrent login won the insert race.
    #[error("user already exists: {0}")]
    DuplicateEmail(String),

    #[error("store error: {0}")]
    Backend(String),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Database(err.to_string())
    }
}

/// Keyed by email; the backing store enforces email uniqueness.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Insert a new user. Fails with [`StoreError::DuplicateEmail`] if a
    /// user with that email already exists; never overwrites.
    async fn create(&self, user: &User) -> Result<(), StoreError>;

    /// Overwrite an existing user record.
    async fn update(&self, user: &User) -> Result<(), StoreError>;
}
