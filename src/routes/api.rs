// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Authenticated API routes.

use axum::{extract::State, routing::get, Extension, Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::Role;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/me", get(me))
}

/// Profile view of the authenticated user. Credentials never leave the
/// store.
#[derive(Serialize)]
pub struct MeResponse {
    pub id: String,
    pub email: String,
    pub username: String,
    pub avatar: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

/// Current user's profile, re-read from the store so profile edits show up
/// without waiting for a new token.
async fn me(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
) -> Result<Json<MeResponse>> {
    let user = state
        .store
        .find_by_email(&auth_user.email)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user {}", auth_user.email)))?;

    Ok(Json(MeResponse {
        id: user.id.clone(),
        email: user.email.clone(),
        username: user.username.clone(),
        avatar: user.avatar.clone(),
        role: user.role(),
        created_at: user.created_at,
        last_login: user.last_login,
    }))
}
