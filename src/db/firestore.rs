// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore-backed user store.
//!
//! Users live in the `users` collection with the email as the document id,
//! which gives us the email-uniqueness constraint at the storage layer: a
//! create-only insert on an existing document fails with a data conflict.

use crate::db::{collections, StoreError, UserStore};
use crate::models::User;
use async_trait::async_trait;
use firestore::errors::FirestoreError;

/// Firestore client wrapper with typed user operations.
#[derive(Clone)]
pub struct FirestoreUserStore {
    client: firestore::FirestoreDb,
}

impl FirestoreUserStore {
    /// Connect to Firestore.
    ///
    /// For local development with the emulator, set FIRESTORE_EMULATOR_HOST;
    /// the connection is then unauthenticated to avoid credential warnings.
    pub async fn connect(project_id: &str) -> Result<Self, StoreError> {
        let client = if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            Self::emulator_client(project_id).await?
        } else {
            firestore::FirestoreDb::new(project_id)
                .await
                .map_err(|e| StoreError::Backend(format!("Firestore connect failed: {e}")))?
        };

        tracing::info!(project = project_id, "Connected to Firestore");
        Ok(Self { client })
    }

    async fn emulator_client(project_id: &str) -> Result<firestore::FirestoreDb, StoreError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        firestore::FirestoreDb::with_options_token_source(
            firestore::FirestoreDbOptions::new(project_id.to_string()),
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| StoreError::Backend(format!("Firestore emulator connect failed: {e}")))
    }
}

#[async_trait]
impl UserStore for FirestoreUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.client
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(email)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))
    }

    async fn create(&self, user: &User) -> Result<(), StoreError> {
        let result: Result<User, FirestoreError> = self
            .client
            .fluent()
            .insert()
            .into(collections::USERS)
            .document_id(&user.email)
            .object(user)
            .execute()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(FirestoreError::DataConflictError(_)) => {
                Err(StoreError::DuplicateEmail(user.email.clone()))
            }
            Err(e) => Err(StoreError::Backend(e.to_string())),
        }
    }

    async fn update(&self, user: &User) -> Result<(), StoreError> {
        let _: () = self
            .client
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&user.email)
            .object(user)
            .execute()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(())
    }
}
