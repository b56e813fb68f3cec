// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use atelier_api::config::Config;
use atelier_api::db::{MemoryUserStore, UserStore};
use atelier_api::models::User;
use atelier_api::routes::create_router;
use atelier_api::services::{AccountProvisioner, GoogleOAuthClient, IdTokenVerifier, TokenService};
use atelier_api::AppState;
use chrono::Utc;
use std::sync::Arc;

/// Create a test app backed by the in-memory user store.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    let config = Config::test_default();
    let store: Arc<dyn UserStore> = Arc::new(MemoryUserStore::new());

    let tokens = TokenService::new(&config, store.clone());
    let provisioner = AccountProvisioner::new(store.clone());
    let google = GoogleOAuthClient::new(&config).expect("OAuth client");
    let oidc = IdTokenVerifier::new(&config).expect("ID token verifier");

    let state = Arc::new(AppState {
        config,
        store,
        tokens,
        provisioner,
        google,
        oidc,
    });

    (create_router(state.clone()), state)
}

/// A user as the provisioner would create it on first Google login.
#[allow(dead_code)]
pub fn test_user(email: &str) -> User {
    User {
        id: uuid::Uuid::new_v4().to_string(),
        email: email.to_string(),
        username: "Test User".to_string(),
        avatar: Some("https://cdn.example.com/avatar.png".to_string()),
        password: uuid::Uuid::new_v4().to_string(),
        google_id: Some("g-12345".to_string()),
        active: true,
        is_admin: false,
        created_at: Utc::now(),
        last_login: None,
    }
}
