// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google OAuth2 / OpenID Connect collaborators.
//!
//! [`GoogleOAuthClient`] drives the authorization-code exchange;
//! [`IdTokenVerifier`] checks the returned ID token against Google's JWKS
//! and produces the identity assertion handed to account provisioning.

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::services::account::OidcAssertion;
use anyhow::Context;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};

const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const JWKS_URL: &str = "https://www.googleapis.com/oauth2/v3/certs";
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);
const JWKS_CACHE_TTL: Duration = Duration::from_secs(300);
const CLOCK_SKEW_SECS: u64 = 60;

/// OAuth2 authorization-code client for Google login.
pub struct GoogleOAuthClient {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
}

impl GoogleOAuthClient {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .context("failed building Google OAuth HTTP client")?;

        Ok(Self {
            http,
            client_id: config.google_client_id.clone(),
            client_secret: config.google_client_secret.clone(),
        })
    }

    /// Authorization URL the browser is redirected to.
    pub fn authorize_url(&self, redirect_uri: &str, state: &str) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}",
            AUTH_URL,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode("openid email profile"),
            state
        )
    }

    /// Exchange an authorization code for the ID token it grants.
    pub async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<String> {
        let response = self
            .http
            .post(TOKEN_URL)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code),
                ("redirect_uri", redirect_uri),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|e| AppError::GoogleOAuth(format!("token exchange failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Google token exchange failed");
            return Err(AppError::GoogleOAuth(format!(
                "token exchange failed with status {status}"
            )));
        }

        let exchange: TokenExchangeResponse = response
            .json()
            .await
            .map_err(|e| AppError::GoogleOAuth(format!("invalid token response: {e}")))?;

        Ok(exchange.id_token)
    }
}

#[derive(Debug, Deserialize)]
struct TokenExchangeResponse {
    id_token: String,
}

enum VerifierMode {
    Google,
    StaticKey {
        kid: String,
        decoding_key: Arc<DecodingKey>,
    },
}

struct JwksCache {
    keys_by_kid: HashMap<String, Arc<DecodingKey>>,
    expires_at: Instant,
}

/// Verifier for Google-issued OIDC ID tokens.
pub struct IdTokenVerifier {
    http: reqwest::Client,
    client_id: String,
    mode: VerifierMode,
    jwks_cache: RwLock<Option<JwksCache>>,
    refresh_lock: Mutex<()>,
}

impl IdTokenVerifier {
    /// Production verifier fetching and caching Google's JWKS.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .context("failed building JWKS HTTP client")?;

        Ok(Self {
            http,
            client_id: config.google_client_id.clone(),
            mode: VerifierMode::Google,
            jwks_cache: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        })
    }

    /// Verifier pinned to a single RSA public key, for deterministic tests.
    pub fn with_static_key(
        config: &Config,
        kid: impl Into<String>,
        decoding_key: DecodingKey,
    ) -> anyhow::Result<Self> {
        let kid = kid.into();
        if kid.trim().is_empty() {
            anyhow::bail!("static kid must not be empty");
        }

        let mut verifier = Self::new(config)?;
        verifier.mode = VerifierMode::StaticKey {
            kid,
            decoding_key: Arc::new(decoding_key),
        };
        Ok(verifier)
    }

    /// Verify an ID token and extract the identity assertion.
    ///
    /// Checks RS256 signature against Google's keys, issuer, audience
    /// (our client id) and expiry. An email whose `email_verified` claim is
    /// false or missing is dropped from the assertion rather than trusted.
    pub async fn verify(&self, id_token: &str) -> Result<OidcAssertion> {
        let header = decode_header(id_token)
            .map_err(|e| AppError::InvalidAssertion(format!("invalid ID token header: {e}")))?;

        if header.alg != Algorithm::RS256 {
            return Err(AppError::InvalidAssertion(format!(
                "unexpected ID token alg: {:?}",
                header.alg
            )));
        }

        let kid = header
            .kid
            .ok_or_else(|| AppError::InvalidAssertion("missing ID token kid".to_string()))?;

        let decoding_key = self.key_for_kid(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation.set_issuer(&["https://accounts.google.com", "accounts.google.com"]);
        validation.set_audience(&[self.client_id.as_str()]);
        validation.leeway = CLOCK_SKEW_SECS;

        let claims = decode::<GoogleIdClaims>(id_token, decoding_key.as_ref(), &validation)
            .map_err(|e| AppError::InvalidAssertion(format!("ID token rejected: {e}")))?
            .claims;

        let email = match (claims.email, claims.email_verified) {
            (Some(email), Some(true)) => Some(email),
            (Some(email), _) => {
                tracing::warn!(email = %email, "Dropping unverified email from Google assertion");
                None
            }
            (None, _) => None,
        };

        Ok(OidcAssertion {
            subject: claims.sub,
            email,
            name: claims.name,
            picture: claims.picture,
        })
    }

    async fn key_for_kid(&self, kid: &str) -> Result<Arc<DecodingKey>> {
        if let VerifierMode::StaticKey {
            kid: static_kid,
            decoding_key,
        } = &self.mode
        {
            if kid == static_kid {
                return Ok(decoding_key.clone());
            }
            return Err(AppError::InvalidAssertion(format!(
                "unknown kid for static verifier: {kid}"
            )));
        }

        if let Some(key) = self.cached_key(kid).await {
            return Ok(key);
        }

        // Cache miss can mean key rotation; refresh once and retry.
        self.refresh_jwks().await?;
        self.cached_key(kid).await.ok_or_else(|| {
            AppError::InvalidAssertion(format!("kid not found in Google JWKS: {kid}"))
        })
    }

    async fn cached_key(&self, kid: &str) -> Option<Arc<DecodingKey>> {
        let cache = self.jwks_cache.read().await;
        let now = Instant::now();
        cache
            .as_ref()
            .filter(|entry| entry.expires_at > now)
            .and_then(|entry| entry.keys_by_kid.get(kid))
            .cloned()
    }

    async fn refresh_jwks(&self) -> Result<()> {
        let _guard = self.refresh_lock.lock().await;

        // Another request may have refreshed while we waited for the lock.
        if self
            .jwks_cache
            .read()
            .await
            .as_ref()
            .is_some_and(|entry| entry.expires_at > Instant::now())
        {
            return Ok(());
        }

        tracing::debug!(url = JWKS_URL, "Refreshing Google JWKS cache");

        let jwks: Jwks = self
            .http
            .get(JWKS_URL)
            .send()
            .await
            .map_err(|e| AppError::GoogleOAuth(format!("JWKS request failed: {e}")))?
            .error_for_status()
            .map_err(|e| AppError::GoogleOAuth(format!("JWKS request rejected: {e}")))?
            .json()
            .await
            .map_err(|e| AppError::GoogleOAuth(format!("invalid JWKS JSON: {e}")))?;

        let mut keys_by_kid = HashMap::new();
        for jwk in jwks.keys {
            if jwk.kty != "RSA" || jwk.kid.trim().is_empty() {
                continue;
            }
            if jwk.alg.as_deref().is_some_and(|alg| alg != "RS256") {
                continue;
            }

            match DecodingKey::from_rsa_components(&jwk.n, &jwk.e) {
                Ok(key) => {
                    keys_by_kid.insert(jwk.kid, Arc::new(key));
                }
                Err(e) => {
                    tracing::warn!(error = %e, kid = %jwk.kid, "Skipping invalid JWKS key");
                }
            }
        }

        if keys_by_kid.is_empty() {
            return Err(AppError::GoogleOAuth(
                "JWKS response contained no usable RSA keys".to_string(),
            ));
        }

        *self.jwks_cache.write().await = Some(JwksCache {
            keys_by_kid,
            expires_at: Instant::now() + JWKS_CACHE_TTL,
        });

        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct Jwks {
    keys: Vec<Jwk>,
}

#[derive(Debug, Deserialize)]
struct Jwk {
    kid: String,
    kty: String,
    alg: Option<String>,
    n: String,
    e: String,
}

#[derive(Debug, Deserialize)]
struct GoogleIdClaims {
    sub: String,
    email: Option<String>,
    email_verified: Option<bool>,
    name: Option<String>,
    picture: Option<String>,
}
