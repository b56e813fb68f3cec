// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Atelier API: backend for the Atelier web application.
//!
//! This crate provides Google OIDC login with just-in-time account
//! provisioning, stateless JWT sessions, CORS wiring and static media
//! serving for the frontend.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use config::Config;
use db::UserStore;
use services::{AccountProvisioner, GoogleOAuthClient, IdTokenVerifier, TokenService};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn UserStore>,
    pub tokens: TokenService,
    pub provisioner: AccountProvisioner,
    pub google: GoogleOAuthClient,
    pub oidc: IdTokenVerifier,
}
