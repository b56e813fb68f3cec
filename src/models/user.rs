//! User model for storage and API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User account stored in Firestore (document id = email).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Stable surrogate key (uuid)
    pub id: String,
    /// Email address, unique; also the JWT subject
    pub email: String,
    /// Display name
    pub username: String,
    /// Avatar URL
    pub avatar: Option<String>,
    /// Password hash, or an opaque placeholder for federated-only accounts
    pub password: String,
    /// Google subject id, present only for accounts created via Google login
    pub google_id: Option<String>,
    /// Blocked accounts cannot log in
    pub active: bool,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    /// None until the first successful login
    pub last_login: Option<DateTime<Utc>>,
}

impl User {
    /// Role derived from the local record. Never taken from an external
    /// identity assertion.
    pub fn role(&self) -> Role {
        if self.is_admin {
            Role::Admin
        } else {
            Role::User
        }
    }
}

/// Authorization role carried in access-token claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "ADMIN")]
    Admin,
    #[serde(rename = "USER")]
    User,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_user() -> User {
        User {
            id: "u-1".to_string(),
            email: "a@example.com".to_string(),
            username: "Alice".to_string(),
            avatar: None,
            password: "placeholder".to_string(),
            google_id: None,
            active: true,
            is_admin: false,
            created_at: Utc::now(),
            last_login: None,
        }
    }

    #[test]
    fn role_follows_admin_flag() {
        let mut user = base_user();
        assert_eq!(user.role(), Role::User);
        user.is_admin = true;
        assert_eq!(user.role(), Role::Admin);
    }

    #[test]
    fn role_serializes_as_uppercase() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"ADMIN\"");
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"USER\"");
    }
}
