// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Atelier API Server
//!
//! Serves Google OIDC login, JWT session tokens and uploaded media for the
//! Atelier frontend.

use atelier_api::{
    config::{Config, StoreBackend},
    db::{FirestoreUserStore, MemoryUserStore, UserStore},
    services::{AccountProvisioner, GoogleOAuthClient, IdTokenVerifier, TokenService},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    // Config errors are fatal; a server with a bad signing key must not start.
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting Atelier API");

    let store: Arc<dyn UserStore> = match config.store_backend {
        StoreBackend::Firestore => Arc::new(
            FirestoreUserStore::connect(&config.gcp_project_id)
                .await
                .expect("Failed to connect to Firestore"),
        ),
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory user store; data is lost on restart");
            Arc::new(MemoryUserStore::new())
        }
    };

    let tokens = TokenService::new(&config, store.clone());
    let provisioner = AccountProvisioner::new(store.clone());
    let google = GoogleOAuthClient::new(&config).expect("Failed to initialize Google OAuth client");
    let oidc = IdTokenVerifier::new(&config).expect("Failed to initialize ID token verifier");

    let state = Arc::new(AppState {
        config: config.clone(),
        store,
        tokens,
        provisioner,
        google,
        oidc,
    });

    let app = atelier_api::routes::create_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("atelier_api=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
