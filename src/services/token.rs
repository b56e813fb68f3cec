// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Stateless JWT session tokens.
//!
//! Access tokens carry the subject plus enough profile/role claims to serve
//! most requests without a store lookup. Refresh tokens carry only the
//! subject, so role or profile changes take effect the next time an access
//! token is minted instead of surviving for the refresh token's lifetime.

use crate::config::Config;
use crate::db::UserStore;
use crate::error::{AppError, Result};
use crate::models::{Role, User};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::Arc;

/// Claims embedded in an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject (user email)
    pub sub: String,
    pub role: Role,
    /// Surrogate user id
    pub id: String,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    /// Issued at (Unix timestamp, seconds)
    pub iat: i64,
    /// Expiration time (Unix timestamp, seconds)
    pub exp: i64,
}

/// Claims embedded in a refresh token. Intentionally minimal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

/// Mints and verifies HS256 session tokens.
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl_ms: i64,
    refresh_ttl_ms: i64,
    store: Arc<dyn UserStore>,
}

impl TokenService {
    /// The signing secret arrives already base64-decoded and length-checked
    /// by [`Config`]; the raw bytes are the HMAC key.
    pub fn new(config: &Config, store: Arc<dyn UserStore>) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(&config.jwt_signing_key),
            decoding_key: DecodingKey::from_secret(&config.jwt_signing_key),
            access_ttl_ms: config.access_ttl_ms,
            refresh_ttl_ms: config.refresh_ttl_ms,
            store,
        }
    }

    /// Mint an access token for a user. Role is derived from the local
    /// record; no side effects beyond token construction.
    pub fn issue_access_token(&self, user: &User) -> Result<String> {
        let iat = Utc::now().timestamp();
        let claims = AccessClaims {
            sub: user.email.clone(),
            role: user.role(),
            id: user.id.clone(),
            username: user.username.clone(),
            avatar: user.avatar.clone(),
            iat,
            exp: iat + self.access_ttl_ms / 1000,
        };

        self.sign(&claims)
    }

    /// Mint a refresh token for a known user.
    ///
    /// Looks the user up first; fails with `NotFound` for unknown emails so
    /// a refresh token can never exist for an account that does not.
    pub async fn issue_refresh_token(&self, email: &str) -> Result<String> {
        let user = self
            .store
            .find_by_email(email)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user {email}")))?;

        let iat = Utc::now().timestamp();
        let claims = RefreshClaims {
            sub: user.email,
            iat,
            exp: iat + self.refresh_ttl_ms / 1000,
        };

        self.sign(&claims)
    }

    /// Parse and verify an access token.
    pub fn decode_access(&self, token: &str) -> Result<AccessClaims> {
        self.verify(token)
    }

    /// Parse and verify a refresh token.
    pub fn decode_refresh(&self, token: &str) -> Result<RefreshClaims> {
        self.verify(token)
    }

    /// True iff the token's subject equals `expected_email` and the token
    /// has not expired.
    ///
    /// Malformed tokens and signature mismatches propagate as errors rather
    /// than collapsing into `Ok(false)`; only a subject mismatch on an
    /// otherwise valid token yields `Ok(false)`. Expiry is enforced during
    /// decoding and surfaces as [`AppError::TokenExpired`].
    pub fn is_valid(&self, token: &str, expected_email: &str) -> Result<bool> {
        let claims = self.decode_access(token)?;
        Ok(claims.sub == expected_email)
    }

    /// Subject (email) of a verified access token.
    pub fn extract_subject(&self, token: &str) -> Result<String> {
        Ok(self.decode_access(token)?.sub)
    }

    /// Expiration (Unix seconds) of a verified access token.
    pub fn extract_expiration(&self, token: &str) -> Result<i64> {
        Ok(self.decode_access(token)?.exp)
    }

    fn sign<C: Serialize>(&self, claims: &C) -> Result<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT signing failed: {e}")))
    }

    fn verify<C: DeserializeOwned>(&self, token: &str) -> Result<C> {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is exact; the default 60s leeway would accept stale tokens.
        validation.leeway = 0;

        decode::<C>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(map_jwt_error)
    }
}

fn map_jwt_error(err: jsonwebtoken::errors::Error) -> AppError {
    use jsonwebtoken::errors::ErrorKind;

    match err.kind() {
        ErrorKind::ExpiredSignature => AppError::TokenExpired,
        ErrorKind::InvalidSignature => AppError::TokenInvalid("signature mismatch".to_string()),
        _ => AppError::TokenInvalid(err.to_string()),
    }
}
