// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Identity provider client (Identity Toolkit REST v1).
//!
//! Handles:
//! - Email/password sign-up and sign-in
//! - OAuth sign-in with a provider credential (Google, GitHub)
//! - Display name updates and password reset emails
//! - Admin lookups, custom claims and account deletion

use crate::config::Config;
use crate::error::AppError;
use crate::models::{AuthErrorCode, AuthSession, AuthUser, OAuthProvider};
use crate::services::service_account::ServiceAccount;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Duration;

const PRODUCTION_BASE_URL: &str = "https://identitytoolkit.googleapis.com/v1";
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Operations the application needs from the identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthSession, AppError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AppError>;

    /// Sign in with a credential obtained from an OAuth provider.
    async fn sign_in_with_idp(
        &self,
        provider: OAuthProvider,
        credential: &str,
    ) -> Result<AuthSession, AppError>;

    async fn update_profile(&self, id_token: &str, display_name: &str)
        -> Result<AuthUser, AppError>;

    async fn send_password_reset(&self, email: &str) -> Result<(), AppError>;

    /// Current user record for an ID token.
    async fn lookup(&self, id_token: &str) -> Result<AuthUser, AppError>;

    // Admin operations, authenticated as the service account.

    async fn get_user_by_email(&self, email: &str) -> Result<Option<AuthUser>, AppError>;

    /// Replace the user's custom claims with `claims` (already validated).
    async fn set_custom_claims(&self, uid: &str, claims: &Map<String, Value>)
        -> Result<(), AppError>;

    async fn delete_user(&self, uid: &str) -> Result<(), AppError>;
}

/// Identity Toolkit REST client.
#[derive(Clone)]
pub struct IdentityToolkitClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    project_id: String,
    request_uri: String,
    service_account: Arc<ServiceAccount>,
    emulator: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponse {
    id_token: String,
    #[serde(default)]
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProviderUserInfo {
    provider_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserRecord {
    local_id: String,
    email: Option<String>,
    display_name: Option<String>,
    photo_url: Option<String>,
    #[serde(default)]
    email_verified: bool,
    #[serde(default)]
    provider_user_info: Vec<ProviderUserInfo>,
}

impl From<UserRecord> for AuthUser {
    fn from(r: UserRecord) -> Self {
        AuthUser {
            uid: r.local_id,
            email: r.email,
            display_name: r.display_name,
            photo_url: r.photo_url,
            email_verified: r.email_verified,
            provider_id: r
                .provider_user_info
                .into_iter()
                .next()
                .map(|p| p.provider_id)
                .or_else(|| Some("password".to_string())),
        }
    }
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<UserRecord>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

impl IdentityToolkitClient {
    pub fn new(config: &Config, service_account: Arc<ServiceAccount>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;

        let (base_url, emulator) = match &config.auth_emulator_host {
            Some(host) => (
                format!("http://{host}/identitytoolkit.googleapis.com/v1"),
                true,
            ),
            None => (PRODUCTION_BASE_URL.to_string(), false),
        };

        Ok(Self {
            http,
            base_url,
            api_key: config.client.api_key.clone(),
            project_id: config.firebase_project_id.clone(),
            request_uri: config.app_url.clone(),
            service_account,
            emulator,
        })
    }

    /// Public endpoint authenticated with the web API key.
    async fn call<T: DeserializeOwned>(&self, method: &str, body: &Value) -> Result<T, AppError> {
        let url = format!("{}/accounts:{}", self.base_url, method);
        let response = self
            .http
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(body)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, method, "Identity request failed");
                AppError::Auth(AuthErrorCode::NetworkError)
            })?;

        check_response_json(response, method).await
    }

    /// Project-scoped admin endpoint authenticated as the service account.
    async fn admin_call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: &Value,
    ) -> Result<T, AppError> {
        let token = if self.emulator {
            "owner".to_string()
        } else {
            self.service_account
                .access_token()
                .await
                .map_err(|e| AppError::Identity(format!("service account token: {e:#}")))?
        };

        let url = format!(
            "{}/projects/{}/accounts:{}",
            self.base_url, self.project_id, method
        );
        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::Identity(format!("{method} request failed: {e}")))?;

        check_response_json(response, method).await
    }

    /// Turn a token response into a session, fetching the full user record.
    async fn session(&self, tokens: TokenResponse) -> Result<AuthSession, AppError> {
        let user = self.lookup(&tokens.id_token).await?;
        Ok(AuthSession {
            expires_in: tokens
                .expires_in
                .as_deref()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3600),
            id_token: tokens.id_token,
            refresh_token: tokens.refresh_token,
            user,
        })
    }
}

/// Check response status and parse JSON body, mapping vendor error messages
/// onto [`AuthErrorCode`].
async fn check_response_json<T: DeserializeOwned>(
    response: reqwest::Response,
    method: &str,
) -> Result<T, AppError> {
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorEnvelope>(&body)
            .map(|e| e.error.message)
            .unwrap_or_default();

        let code = AuthErrorCode::from_identity_message(&message);
        if code == AuthErrorCode::Unknown {
            tracing::warn!(%status, method, body = %body, "Unrecognized identity error");
        } else {
            tracing::debug!(%status, method, code = %code, "Identity request rejected");
        }
        return Err(AppError::Auth(code));
    }

    response
        .json()
        .await
        .map_err(|e| AppError::Identity(format!("{method}: JSON parse error: {e}")))
}

#[async_trait]
impl IdentityProvider for IdentityToolkitClient {
    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthSession, AppError> {
        let body = serde_json::to_value(PasswordRequest {
            email,
            password,
            return_secure_token: true,
        })
        .map_err(anyhow::Error::from)?;
        let tokens: TokenResponse = self.call("signUp", &body).await?;
        self.session(tokens).await
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AppError> {
        let body = serde_json::to_value(PasswordRequest {
            email,
            password,
            return_secure_token: true,
        })
        .map_err(anyhow::Error::from)?;
        let tokens: TokenResponse = self.call("signInWithPassword", &body).await?;
        self.session(tokens).await
    }

    async fn sign_in_with_idp(
        &self,
        provider: OAuthProvider,
        credential: &str,
    ) -> Result<AuthSession, AppError> {
        let post_body = format!(
            "{}={}&providerId={}",
            provider.credential_param(),
            urlencoding::encode(credential),
            provider.provider_id()
        );
        let body = json!({
            "postBody": post_body,
            "requestUri": self.request_uri,
            "returnSecureToken": true,
            "returnIdpCredential": true,
        });
        let tokens: TokenResponse = self.call("signInWithIdp", &body).await?;
        self.session(tokens).await
    }

    async fn update_profile(
        &self,
        id_token: &str,
        display_name: &str,
    ) -> Result<AuthUser, AppError> {
        let body = json!({
            "idToken": id_token,
            "displayName": display_name,
            "returnSecureToken": false,
        });
        let _: Value = self.call("update", &body).await?;
        self.lookup(id_token).await
    }

    async fn send_password_reset(&self, email: &str) -> Result<(), AppError> {
        let body = json!({ "requestType": "PASSWORD_RESET", "email": email });
        let _: Value = self.call("sendOobCode", &body).await?;
        Ok(())
    }

    async fn lookup(&self, id_token: &str) -> Result<AuthUser, AppError> {
        let response: LookupResponse = self.call("lookup", &json!({ "idToken": id_token })).await?;
        response
            .users
            .into_iter()
            .next()
            .map(AuthUser::from)
            .ok_or(AppError::Auth(AuthErrorCode::UserNotFound))
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<AuthUser>, AppError> {
        let response: LookupResponse = self.admin_call("lookup", &json!({ "email": [email] })).await?;
        Ok(response.users.into_iter().next().map(AuthUser::from))
    }

    async fn set_custom_claims(
        &self,
        uid: &str,
        claims: &Map<String, Value>,
    ) -> Result<(), AppError> {
        let attributes = serde_json::to_string(claims).map_err(anyhow::Error::from)?;
        let body = json!({ "localId": uid, "customAttributes": attributes });
        let _: Value = self.admin_call("update", &body).await?;
        Ok(())
    }

    async fn delete_user(&self, uid: &str) -> Result<(), AppError> {
        let _: Value = self.admin_call("delete", &json!({ "localId": uid })).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_record_provider_defaults_to_password() {
        let record: UserRecord = serde_json::from_value(json!({
            "localId": "u1",
            "email": "a@example.com",
        }))
        .unwrap();
        let user = AuthUser::from(record);
        assert_eq!(user.provider_id.as_deref(), Some("password"));
        assert_eq!(user.sign_up_method(), "email");
    }

    #[test]
    fn user_record_uses_first_linked_provider() {
        let record: UserRecord = serde_json::from_value(json!({
            "localId": "u2",
            "emailVerified": true,
            "photoUrl": "https://example.com/p.png",
            "providerUserInfo": [{"providerId": "github.com"}, {"providerId": "password"}],
        }))
        .unwrap();
        let user = AuthUser::from(record);
        assert_eq!(user.sign_up_method(), "github.com");
        assert!(user.email_verified);
        assert_eq!(user.photo_url.as_deref(), Some("https://example.com/p.png"));
    }

    #[test]
    fn emulator_base_url() {
        let mut config = Config::test_default();
        config.auth_emulator_host = Some("localhost:9099".to_string());
        let sa = Arc::new(ServiceAccount::from_config(&config, reqwest::Client::new()));
        let client = IdentityToolkitClient::new(&config, sa).unwrap();
        assert_eq!(
            client.base_url,
            "http://localhost:9099/identitytoolkit.googleapis.com/v1"
        );
        assert!(client.emulator);
    }
}
