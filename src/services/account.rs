// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Just-in-time account provisioning for Google logins.
//!
//! Takes a verified identity assertion and reconciles it with the local
//! user store. Google asserts who the caller is, never what they may do:
//! the role returned here is always derived from the local record.

use crate::db::{StoreError, UserStore};
use crate::error::{AppError, Result};
use crate::models::{Role, User};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

/// Identity assertion produced by the ID-token verifier.
#[derive(Debug, Clone)]
pub struct OidcAssertion {
    /// Google's stable identifier for this identity (`sub` claim)
    pub subject: String,
    pub email: Option<String>,
    /// Display name; login falls back to the email when absent
    pub name: Option<String>,
    pub picture: Option<String>,
}

/// Outcome of a successful login: the local account and its derived role.
#[derive(Debug, Clone)]
pub struct AuthenticatedIdentity {
    pub user: User,
    pub role: Role,
}

/// Finds or creates local accounts for federated logins.
pub struct AccountProvisioner {
    store: Arc<dyn UserStore>,
}

impl AccountProvisioner {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    /// Resolve an assertion to a local account.
    ///
    /// First-time logins create the account; later logins reuse the existing
    /// record untouched apart from `last_login`. Blocked accounts are
    /// rejected before any state changes.
    pub async fn provision(&self, assertion: &OidcAssertion) -> Result<AuthenticatedIdentity> {
        let email = assertion
            .email
            .as_deref()
            .filter(|e| !e.is_empty())
            .ok_or_else(|| {
                AppError::InvalidAssertion("assertion carries no email".to_string())
            })?;

        let mut user = match self.store.find_by_email(email).await? {
            Some(existing) => existing,
            None => match self.create_account(email, assertion).await {
                Ok(created) => created,
                // A concurrent first login for the same email won the
                // insert; re-read once and continue with that record.
                Err(StoreError::DuplicateEmail(_)) => self
                    .store
                    .find_by_email(email)
                    .await?
                    .ok_or_else(|| {
                        AppError::Database(format!("user {email} vanished after insert conflict"))
                    })?,
                Err(e) => return Err(e.into()),
            },
        };

        if !user.active {
            tracing::warn!(email, "Blocked account attempted login");
            return Err(AppError::AccountBlocked);
        }

        user.last_login = Some(Utc::now());
        self.store.update(&user).await?;

        let role = user.role();
        Ok(AuthenticatedIdentity { user, role })
    }

    async fn create_account(
        &self,
        email: &str,
        assertion: &OidcAssertion,
    ) -> std::result::Result<User, StoreError> {
        let user = User {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            username: assertion.name.clone().unwrap_or_else(|| email.to_string()),
            avatar: assertion.picture.clone(),
            // Opaque placeholder; federated accounts never log in with it.
            password: Uuid::new_v4().to_string(),
            google_id: Some(assertion.subject.clone()),
            active: true,
            is_admin: false,
            created_at: Utc::now(),
            last_login: None,
        };

        self.store.create(&user).await?;

        tracing::info!(
            email,
            google_id = %assertion.subject,
            "Provisioned new account from Google login"
        );

        Ok(user)
    }
}
