// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Identity-provider types: user records, sessions, OAuth providers and the
//! error-code table used to build user-facing messages.

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// A user record as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct AuthUser {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
    pub email_verified: bool,
    /// First linked provider (`password`, `google.com`, `github.com`, ...).
    pub provider_id: Option<String>,
}

impl AuthUser {
    /// Sign-up method recorded on a new profile.
    ///
    /// Password accounts are recorded as `"email"`, federated ones by provider id.
    pub fn sign_up_method(&self) -> String {
        match self.provider_id.as_deref() {
            None | Some("") | Some("password") => "email".to_string(),
            Some(provider) => provider.to_string(),
        }
    }
}

/// Tokens issued by a successful sign-in.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSession {
    pub id_token: String,
    pub refresh_token: String,
    /// Lifetime of `id_token` in seconds
    pub expires_in: u64,
    pub user: AuthUser,
}

/// Supported OAuth identity providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OAuthProvider {
    Google,
    Github,
}

impl OAuthProvider {
    /// Provider id as used by the identity service.
    pub fn provider_id(&self) -> &'static str {
        match self {
            OAuthProvider::Google => "google.com",
            OAuthProvider::Github => "github.com",
        }
    }

    /// Name of the credential parameter the identity service expects.
    pub fn credential_param(&self) -> &'static str {
        match self {
            OAuthProvider::Google => "id_token",
            OAuthProvider::Github => "access_token",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            OAuthProvider::Google => "google",
            OAuthProvider::Github => "github",
        }
    }
}

impl std::str::FromStr for OAuthProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "google" => Ok(OAuthProvider::Google),
            "github" => Ok(OAuthProvider::Github),
            other => Err(format!("unsupported provider: {other}")),
        }
    }
}

/// Identity-provider error codes with fixed user-facing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorCode {
    EmailExists,
    InvalidEmail,
    UserDisabled,
    UserNotFound,
    WrongPassword,
    InvalidCredential,
    WeakPassword,
    NetworkError,
    TooManyRequests,
    PopupClosed,
    UnauthorizedDomain,
    Unknown,
}

impl AuthErrorCode {
    const ALL: [AuthErrorCode; 12] = [
        AuthErrorCode::EmailExists,
        AuthErrorCode::InvalidEmail,
        AuthErrorCode::UserDisabled,
        AuthErrorCode::UserNotFound,
        AuthErrorCode::WrongPassword,
        AuthErrorCode::InvalidCredential,
        AuthErrorCode::WeakPassword,
        AuthErrorCode::NetworkError,
        AuthErrorCode::TooManyRequests,
        AuthErrorCode::PopupClosed,
        AuthErrorCode::UnauthorizedDomain,
        AuthErrorCode::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AuthErrorCode::EmailExists => "auth/email-already-in-use",
            AuthErrorCode::InvalidEmail => "auth/invalid-email",
            AuthErrorCode::UserDisabled => "auth/user-disabled",
            AuthErrorCode::UserNotFound => "auth/user-not-found",
            AuthErrorCode::WrongPassword => "auth/wrong-password",
            AuthErrorCode::InvalidCredential => "auth/invalid-credential",
            AuthErrorCode::WeakPassword => "auth/weak-password",
            AuthErrorCode::NetworkError => "auth/network-request-failed",
            AuthErrorCode::TooManyRequests => "auth/too-many-requests",
            AuthErrorCode::PopupClosed => "auth/popup-closed-by-user",
            AuthErrorCode::UnauthorizedDomain => "auth/unauthorized-domain",
            AuthErrorCode::Unknown => "auth/internal-error",
        }
    }

    /// User-facing message for this code.
    pub fn message(&self) -> &'static str {
        match self {
            AuthErrorCode::EmailExists => {
                "This email is already registered. Please sign in instead."
            }
            AuthErrorCode::InvalidEmail => "Please enter a valid email address.",
            AuthErrorCode::UserDisabled => {
                "This account has been disabled. Please contact support."
            }
            AuthErrorCode::UserNotFound => {
                "No account found with this email. Please sign up first."
            }
            AuthErrorCode::WrongPassword => "Incorrect password. Please try again.",
            AuthErrorCode::InvalidCredential => "Invalid email or password. Please try again.",
            AuthErrorCode::WeakPassword => "Password should be at least 6 characters long.",
            AuthErrorCode::NetworkError => {
                "Network error. Please check your connection and try again."
            }
            AuthErrorCode::TooManyRequests => "Too many failed attempts. Please try again later.",
            AuthErrorCode::PopupClosed => "Sign-in popup was closed. Please try again.",
            AuthErrorCode::UnauthorizedDomain => {
                "This domain is not authorized for authentication."
            }
            AuthErrorCode::Unknown => "An unexpected error occurred. Please try again.",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AuthErrorCode::EmailExists => StatusCode::CONFLICT,
            AuthErrorCode::InvalidEmail
            | AuthErrorCode::WeakPassword
            | AuthErrorCode::PopupClosed => StatusCode::BAD_REQUEST,
            AuthErrorCode::UserNotFound
            | AuthErrorCode::WrongPassword
            | AuthErrorCode::InvalidCredential => StatusCode::UNAUTHORIZED,
            AuthErrorCode::UserDisabled | AuthErrorCode::UnauthorizedDomain => {
                StatusCode::FORBIDDEN
            }
            AuthErrorCode::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            AuthErrorCode::NetworkError => StatusCode::BAD_GATEWAY,
            AuthErrorCode::Unknown => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Look up a client-SDK style code (`auth/...`). Unrecognized codes map to `Unknown`.
    pub fn from_code(code: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|c| *c != AuthErrorCode::Unknown && c.as_str() == code)
            .unwrap_or(AuthErrorCode::Unknown)
    }

    /// Map an Identity Toolkit REST error message (`"WEAK_PASSWORD : ..."`).
    pub fn from_identity_message(message: &str) -> Self {
        let key = message.split(" : ").next().unwrap_or_default().trim();
        match key {
            "EMAIL_EXISTS" => AuthErrorCode::EmailExists,
            "INVALID_EMAIL" | "MISSING_EMAIL" => AuthErrorCode::InvalidEmail,
            "USER_DISABLED" => AuthErrorCode::UserDisabled,
            "EMAIL_NOT_FOUND" | "USER_NOT_FOUND" => AuthErrorCode::UserNotFound,
            "INVALID_PASSWORD" | "MISSING_PASSWORD" => AuthErrorCode::WrongPassword,
            "INVALID_LOGIN_CREDENTIALS" | "INVALID_IDP_RESPONSE" | "INVALID_ID_TOKEN" => {
                AuthErrorCode::InvalidCredential
            }
            "WEAK_PASSWORD" => AuthErrorCode::WeakPassword,
            "TOO_MANY_ATTEMPTS_TRY_LATER" => AuthErrorCode::TooManyRequests,
            "UNAUTHORIZED_DOMAIN" => AuthErrorCode::UnauthorizedDomain,
            _ => AuthErrorCode::Unknown,
        }
    }
}

impl std::fmt::Display for AuthErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
