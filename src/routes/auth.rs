// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google OAuth login and token refresh routes.

use axum::{
    extract::{Query, State},
    response::Redirect,
    routing::{get, post},
    Json, Router,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{AppError, Result};
use crate::AppState;

type HmacSha256 = Hmac<Sha256>;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/google", get(auth_start))
        .route("/auth/google/callback", get(auth_callback))
        .route("/auth/refresh", post(refresh))
}

/// Query parameters for starting the login flow.
#[derive(Deserialize)]
pub struct AuthStartParams {
    /// Frontend URL to redirect back to after login completes.
    /// If not provided, uses the configured frontend URL.
    #[serde(default)]
    redirect_uri: Option<String>,
}

/// Start the login flow: redirect to Google's authorization endpoint.
async fn auth_start(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AuthStartParams>,
    headers: axum::http::HeaderMap,
) -> Result<Redirect> {
    let frontend_url = params
        .redirect_uri
        .unwrap_or_else(|| state.config.frontend_url.clone());

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("System time error: {}", e)))?
        .as_millis();

    // State payload is "frontend_url|timestamp_hex", HMAC-signed so the
    // callback can trust the redirect target it carries.
    let state_payload = format!("{}|{:x}", frontend_url, timestamp);

    let mut mac = HmacSha256::new_from_slice(&state.config.oauth_state_key)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init failed: {}", e)))?;
    mac.update(state_payload.as_bytes());
    let signature = mac.finalize().into_bytes();

    let signed_state = format!("{}|{}", state_payload, hex::encode(signature));
    let oauth_state = URL_SAFE_NO_PAD.encode(signed_state.as_bytes());

    let callback_url = callback_url(&headers);
    let auth_url = state.google.authorize_url(&callback_url, &oauth_state);

    tracing::info!(
        frontend_url = %frontend_url,
        "Starting login flow, redirecting to Google"
    );

    Ok(Redirect::temporary(&auth_url))
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    state: String,
    #[serde(default)]
    error: Option<String>,
}

/// OAuth callback: exchange the code, verify the ID token, provision the
/// account and hand the session tokens to the frontend.
async fn auth_callback(
    State(state): State<Arc<AppState>>,
    headers: axum::http::HeaderMap,
    Query(params): Query<CallbackParams>,
) -> Result<Redirect> {
    // Decode and verify frontend URL from the state parameter
    let frontend_url = verify_and_decode_state(&params.state, &state.config.oauth_state_key)
        .unwrap_or_else(|| {
            tracing::warn!(
                "Invalid or tampered state parameter, falling back to default frontend URL"
            );
            state.config.frontend_url.clone()
        });

    if let Some(error) = params.error {
        tracing::warn!(error = %error, "OAuth error from Google");
        let redirect = format!("{}?error={}", frontend_url, urlencoding::encode(&error));
        return Ok(Redirect::temporary(&redirect));
    }

    let Some(code) = params.code else {
        let redirect = format!("{}?error=missing_code", frontend_url);
        return Ok(Redirect::temporary(&redirect));
    };

    let callback_url = callback_url(&headers);
    let id_token = state.google.exchange_code(&code, &callback_url).await?;
    let assertion = state.oidc.verify(&id_token).await?;

    let identity = match state.provisioner.provision(&assertion).await {
        Ok(identity) => identity,
        // Rejected authentication: no token minted, error surfaced to the
        // frontend as a login failure.
        Err(AppError::AccountBlocked) => {
            let redirect = format!("{}?error=account_blocked", frontend_url);
            return Ok(Redirect::temporary(&redirect));
        }
        Err(AppError::InvalidAssertion(msg)) => {
            tracing::warn!(error = %msg, "Rejected Google assertion");
            let redirect = format!("{}?error=invalid_assertion", frontend_url);
            return Ok(Redirect::temporary(&redirect));
        }
        Err(e) => return Err(e),
    };

    let access_token = state.tokens.issue_access_token(&identity.user)?;
    let refresh_token = state
        .tokens
        .issue_refresh_token(&identity.user.email)
        .await?;

    tracing::info!(
        email = %identity.user.email,
        role = ?identity.role,
        "Login successful, session tokens minted"
    );

    let redirect_url = format!(
        "{}/callback?token={}&refresh_token={}",
        frontend_url, access_token, refresh_token
    );

    Ok(Redirect::temporary(&redirect_url))
}

#[derive(Deserialize)]
pub struct RefreshRequest {
    refresh_token: String,
}

#[derive(Serialize)]
pub struct RefreshResponse {
    access_token: String,
    expires_in: i64,
}

/// Mint a fresh access token from a refresh token.
///
/// The refresh token carries only the subject; role and profile are
/// re-read from the store so revoked privileges or a block take effect
/// here, not at the old token's expiry.
async fn refresh(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RefreshRequest>,
) -> Result<Json<RefreshResponse>> {
    let claims = state.tokens.decode_refresh(&body.refresh_token)?;

    let user = state
        .store
        .find_by_email(&claims.sub)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user {}", claims.sub)))?;

    if !user.active {
        return Err(AppError::AccountBlocked);
    }

    let access_token = state.tokens.issue_access_token(&user)?;

    Ok(Json(RefreshResponse {
        access_token,
        expires_in: state.config.access_ttl_ms / 1000,
    }))
}

/// Callback URL derived from the request's Host header.
fn callback_url(headers: &axum::http::HeaderMap) -> String {
    let host = headers
        .get(axum::http::header::HOST)
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| {
            std::env::var("API_HOST").unwrap_or_else(|_| "localhost:8080".to_string())
        });

    let scheme = if host.contains("localhost") || host.contains("127.0.0.1") {
        "http"
    } else {
        "https"
    };

    format!("{}://{}/auth/google/callback", scheme, host)
}

/// Verify the HMAC signature and decode the frontend URL from the OAuth
/// state parameter.
fn verify_and_decode_state(state: &str, secret: &[u8]) -> Option<String> {
    let bytes = URL_SAFE_NO_PAD.decode(state).ok()?;
    let state_str = String::from_utf8(bytes).ok()?;

    // Format is "frontend_url|timestamp_hex|signature_hex"
    let parts: Vec<&str> = state_str.splitn(3, '|').collect();
    if parts.len() != 3 {
        return None;
    }

    let frontend_url = parts[0];
    let timestamp_hex = parts[1];
    let signature_hex = parts[2];

    let payload = format!("{}|{}", frontend_url, timestamp_hex);

    let mut mac = HmacSha256::new_from_slice(secret).ok()?;
    mac.update(payload.as_bytes());

    let expected_signature = hex::encode(mac.finalize().into_bytes());

    if signature_hex != expected_signature {
        tracing::error!("OAuth state signature mismatch! Potential tampering.");
        return None;
    }

    Some(frontend_url.to_string())
}
