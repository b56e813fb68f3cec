//! Application configuration loaded from environment variables.
//!
//! Everything is read once at startup; secrets are decoded and validated
//! here so a bad deployment fails before the server binds.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use std::env;

/// Minimum HMAC-SHA256 key length accepted for the JWT signing secret.
const MIN_SIGNING_KEY_BYTES: usize = 32;

/// Which user-store backend to run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Firestore,
    Memory,
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Google OAuth client ID (public)
    pub google_client_id: String,
    /// Frontend URL for OAuth redirects and CORS
    pub frontend_url: String,
    /// GCP project ID (Firestore)
    pub gcp_project_id: String,
    /// User-store backend selector
    pub store_backend: StoreBackend,
    /// Directory uploaded media is served from
    pub upload_dir: String,
    /// URL prefix media is mounted under (e.g. `/media`)
    pub media_url_prefix: String,
    /// Server port
    pub port: u16,

    // --- Secrets ---
    /// Google OAuth client secret
    pub google_client_secret: String,
    /// JWT signing key, decoded from base64 (raw HMAC key bytes)
    pub jwt_signing_key: Vec<u8>,
    /// Access-token lifetime in milliseconds
    pub access_ttl_ms: i64,
    /// Refresh-token lifetime in milliseconds
    pub refresh_ttl_ms: i64,
    /// Key used to sign the OAuth `state` parameter
    pub oauth_state_key: Vec<u8>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let store_backend = match env::var("STORE_BACKEND").as_deref() {
            Ok("memory") => StoreBackend::Memory,
            _ => StoreBackend::Firestore,
        };

        Ok(Self {
            google_client_id: env::var("GOOGLE_CLIENT_ID")
                .map_err(|_| ConfigError::Missing("GOOGLE_CLIENT_ID"))?,
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            store_backend,
            upload_dir: env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".to_string()),
            media_url_prefix: env::var("MEDIA_URL_PREFIX").unwrap_or_else(|_| "/media".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),

            google_client_secret: env::var("GOOGLE_CLIENT_SECRET")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("GOOGLE_CLIENT_SECRET"))?,
            jwt_signing_key: decode_signing_key(
                &env::var("JWT_SECRET").map_err(|_| ConfigError::Missing("JWT_SECRET"))?,
            )?,
            access_ttl_ms: parse_ttl("JWT_ACCESS_TTL_MS", 60 * 60 * 1000)?,
            refresh_ttl_ms: parse_ttl("JWT_REFRESH_TTL_MS", 14 * 24 * 60 * 60 * 1000)?,
            oauth_state_key: env::var("OAUTH_STATE_KEY")
                .map_err(|_| ConfigError::Missing("OAUTH_STATE_KEY"))?
                .into_bytes(),
        })
    }

    /// Default config for tests only.
    pub fn test_default() -> Self {
        Self {
            google_client_id: "test-client-id.apps.googleusercontent.com".to_string(),
            frontend_url: "http://localhost:5173".to_string(),
            gcp_project_id: "test-project".to_string(),
            store_backend: StoreBackend::Memory,
            upload_dir: "uploads".to_string(),
            media_url_prefix: "/media".to_string(),
            port: 8080,
            google_client_secret: "test-client-secret".to_string(),
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!!".to_vec(),
            access_ttl_ms: 60 * 60 * 1000,
            refresh_ttl_ms: 14 * 24 * 60 * 60 * 1000,
            oauth_state_key: b"test_oauth_state_key".to_vec(),
        }
    }
}

/// Decode the base64 signing secret into raw HMAC key bytes.
///
/// The decoded bytes are used directly as the HS256 key; there is no KDF
/// step. Keys shorter than 256 bits are rejected here rather than at first
/// mint.
fn decode_signing_key(secret: &str) -> Result<Vec<u8>, ConfigError> {
    let key = BASE64
        .decode(secret.trim())
        .map_err(|e| ConfigError::InvalidSigningKey(format!("JWT_SECRET is not base64: {e}")))?;

    if key.len() < MIN_SIGNING_KEY_BYTES {
        return Err(ConfigError::InvalidSigningKey(format!(
            "JWT_SECRET decodes to {} bytes, need at least {}",
            key.len(),
            MIN_SIGNING_KEY_BYTES
        )));
    }

    Ok(key)
}

fn parse_ttl(var: &'static str, default: i64) -> Result<i64, ConfigError> {
    let Ok(raw) = env::var(var) else {
        return Ok(default);
    };

    let ms: i64 = raw
        .parse()
        .map_err(|_| ConfigError::InvalidTtl(var, raw.clone()))?;

    if ms <= 0 {
        return Err(ConfigError::InvalidTtl(var, raw));
    }

    Ok(ms)
}

/// Configuration errors. All of these are fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid JWT signing key: {0}")]
    InvalidSigningKey(String),

    #[error("Invalid token TTL in {0}: {1:?}")]
    InvalidTtl(&'static str, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signing_key_decodes_valid_base64() {
        let raw = [7u8; 32];
        let encoded = BASE64.encode(raw);
        let key = decode_signing_key(&encoded).expect("32-byte key should decode");
        assert_eq!(key, raw);
    }

    #[test]
    fn signing_key_rejects_short_secret() {
        let encoded = BASE64.encode(b"too-short");
        let err = decode_signing_key(&encoded).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSigningKey(_)));
    }

    #[test]
    fn signing_key_rejects_non_base64() {
        let err = decode_signing_key("!!not base64!!").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSigningKey(_)));
    }

    #[test]
    fn ttl_rejects_zero_and_garbage() {
        env::set_var("TEST_TTL_MS", "0");
        assert!(parse_ttl("TEST_TTL_MS", 1000).is_err());
        env::set_var("TEST_TTL_MS", "soon");
        assert!(parse_ttl("TEST_TTL_MS", 1000).is_err());
        env::remove_var("TEST_TTL_MS");
        assert_eq!(parse_ttl("TEST_TTL_MS", 1000).unwrap(), 1000);
    }
}
