//! In-memory user store for tests and local development.

use crate::db::{StoreError, UserStore};
use crate::models::User;
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

/// DashMap-backed store keyed by email. The entry API makes create-if-absent
/// atomic, matching the uniqueness constraint Firestore gives us via
/// document ids.
#[derive(Default)]
pub struct MemoryUserStore {
    users: DashMap<String, User>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self.users.get(email).map(|entry| entry.value().clone()))
    }

    async fn create(&self, user: &User) -> Result<(), StoreError> {
        match self.users.entry(user.email.clone()) {
            Entry::Occupied(_) => Err(StoreError::DuplicateEmail(user.email.clone())),
            Entry::Vacant(slot) => {
                slot.insert(user.clone());
                Ok(())
            }
        }
    }

    async fn update(&self, user: &User) -> Result<(), StoreError> {
        match self.users.entry(user.email.clone()) {
            Entry::Occupied(mut existing) => {
                existing.insert(user.clone());
                Ok(())
            }
            Entry::Vacant(_) => Err(StoreError::Backend(format!(
                "update of nonexistent user: {}",
                user.email
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user(email: &str) -> User {
        User {
            id: uuid::Uuid::new_v4().to_string(),
            email: email.to_string(),
            username: email.to_string(),
            avatar: None,
            password: uuid::Uuid::new_v4().to_string(),
            google_id: Some("g-1".to_string()),
            active: true,
            is_admin: false,
            created_at: Utc::now(),
            last_login: None,
        }
    }

    #[tokio::test]
    async fn create_then_find_roundtrip() {
        let store = MemoryUserStore::new();
        let u = user("a@example.com");
        store.create(&u).await.unwrap();

        let found = store.find_by_email("a@example.com").await.unwrap().unwrap();
        assert_eq!(found.id, u.id);
        assert!(store.find_by_email("b@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_create_is_rejected() {
        let store = MemoryUserStore::new();
        store.create(&user("a@example.com")).await.unwrap();

        let err = store.create(&user("a@example.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEmail(_)));
    }

    #[tokio::test]
    async fn update_requires_existing_user() {
        let store = MemoryUserStore::new();
        let err = store.update(&user("a@example.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::Backend(_)));
    }
}
