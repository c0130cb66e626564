// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Service-account credentials: OAuth2 access tokens for admin REST calls and
//! signed custom tokens.

use crate::config::Config;
use anyhow::{bail, Context};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;

const TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const CUSTOM_TOKEN_AUDIENCE: &str =
    "https://identitytoolkit.googleapis.com/google.identity.identitytoolkit.v1.IdentityToolkit";
const SCOPES: &str =
    "https://www.googleapis.com/auth/cloud-platform https://www.googleapis.com/auth/identitytoolkit";
const TOKEN_LIFETIME_SECS: u64 = 3600;
/// Refresh a cached access token this long before it expires.
const EXPIRY_MARGIN_SECS: u64 = 60;
const MAX_UID_LEN: usize = 128;
const MAX_CLAIMS_BYTES: usize = 1000;

/// Claim names Firebase reserves for itself.
pub const RESERVED_CLAIMS: &[&str] = &[
    "acr", "amr", "at_hash", "aud", "auth_time", "azp", "cnf", "c_hash", "exp", "iat", "iss",
    "jti", "nbf", "nonce", "sub", "firebase",
];

#[derive(Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: u64,
    exp: u64,
}

#[derive(Serialize)]
struct CustomTokenClaims<'a> {
    iss: &'a str,
    sub: &'a str,
    aud: &'a str,
    iat: u64,
    exp: u64,
    uid: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    claims: Option<&'a Map<String, Value>>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

struct CachedToken {
    token: String,
    expires_at: u64,
}

pub struct ServiceAccount {
    client_email: String,
    encoding_key: Option<EncodingKey>,
    http_client: reqwest::Client,
    cached: Mutex<Option<CachedToken>>,
}

impl ServiceAccount {
    /// Load credentials from config. A missing or unparsable private key is
    /// tolerated at startup (admin operations then fail) so that local runs
    /// against emulators don't need a real key.
    pub fn from_config(config: &Config, http_client: reqwest::Client) -> Self {
        let encoding_key = if config.firebase_private_key.is_empty() {
            None
        } else {
            match EncodingKey::from_rsa_pem(config.firebase_private_key.as_bytes()) {
                Ok(key) => Some(key),
                Err(e) => {
                    tracing::warn!(error = %e, "Service account private key is not a valid RSA PEM");
                    None
                }
            }
        };

        Self {
            client_email: config.firebase_client_email.clone(),
            encoding_key,
            http_client,
            cached: Mutex::new(None),
        }
    }

    pub fn client_email(&self) -> &str {
        &self.client_email
    }

    fn key(&self) -> anyhow::Result<&EncodingKey> {
        self.encoding_key
            .as_ref()
            .context("service account private key not configured")
    }

    /// OAuth2 access token, cached until shortly before it expires.
    pub async fn access_token(&self) -> anyhow::Result<String> {
        let mut cached = self.cached.lock().await;
        let now = now_unix_secs();

        if let Some(token) = cached.as_ref().filter(|t| t.expires_at > now + EXPIRY_MARGIN_SECS) {
            return Ok(token.token.clone());
        }

        let assertion = encode(
            &Header::new(Algorithm::RS256),
            &AssertionClaims {
                iss: &self.client_email,
                scope: SCOPES,
                aud: TOKEN_URI,
                iat: now,
                exp: now + TOKEN_LIFETIME_SECS,
            },
            self.key()?,
        )
        .context("failed signing token assertion")?;

        let response = self
            .http_client
            .post(TOKEN_URI)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .context("token request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("token endpoint returned {status}: {body}");
        }

        let token: TokenResponse = response.json().await.context("invalid token response")?;

        tracing::debug!(expires_in = token.expires_in, "Obtained service account access token");

        *cached = Some(CachedToken {
            token: token.access_token.clone(),
            expires_at: now + token.expires_in,
        });
        Ok(token.access_token)
    }

    /// Sign a custom token the client can exchange for an ID token.
    pub fn create_custom_token(
        &self,
        uid: &str,
        claims: Option<&Map<String, Value>>,
    ) -> anyhow::Result<String> {
        if uid.is_empty() || uid.len() > MAX_UID_LEN {
            bail!("uid must be 1 to {MAX_UID_LEN} characters");
        }
        if let Some(claims) = claims {
            check_reserved(claims)?;
        }

        let now = now_unix_secs();
        encode(
            &Header::new(Algorithm::RS256),
            &CustomTokenClaims {
                iss: &self.client_email,
                sub: &self.client_email,
                aud: CUSTOM_TOKEN_AUDIENCE,
                iat: now,
                exp: now + TOKEN_LIFETIME_SECS,
                uid,
                claims: claims.filter(|c| !c.is_empty()),
            },
            self.key()?,
        )
        .context("failed signing custom token")
    }
}

fn check_reserved(claims: &Map<String, Value>) -> anyhow::Result<()> {
    if let Some(name) = claims.keys().find(|k| RESERVED_CLAIMS.contains(&k.as_str())) {
        bail!("claim \"{name}\" is reserved");
    }
    Ok(())
}

/// Validate custom user claims before they are stored.
pub fn validate_custom_claims(claims: &Map<String, Value>) -> anyhow::Result<String> {
    check_reserved(claims)?;
    let serialized = serde_json::to_string(claims)?;
    if serialized.len() > MAX_CLAIMS_BYTES {
        bail!("custom claims must not exceed {MAX_CLAIMS_BYTES} bytes");
    }
    Ok(serialized)
}

fn now_unix_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
