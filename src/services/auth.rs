// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Sign-up / sign-in flows.
//!
//! Every successful sign-in upserts the user's profile. Profile and
//! display-name failures after the account operation succeeded are logged
//! and do not fail the sign-in.

use crate::error::{AppError, Result};
use crate::models::{AuthErrorCode, AuthSession, OAuthProvider};
use crate::services::identity::IdentityProvider;
use crate::services::users::UserService;
use std::sync::Arc;

pub struct AuthService {
    identity: Arc<dyn IdentityProvider>,
    users: Arc<UserService>,
}

/// Normalize any failure into an auth error code for the caller.
fn auth_failure(operation: &'static str, err: AppError) -> AppError {
    match err {
        AppError::Auth(code) => {
            tracing::warn!(operation, code = %code, "Auth operation failed");
            AppError::Auth(code)
        }
        other => {
            tracing::error!(operation, error = %other, "Auth operation failed");
            AppError::Auth(AuthErrorCode::Unknown)
        }
    }
}

impl AuthService {
    pub fn new(identity: Arc<dyn IdentityProvider>, users: Arc<UserService>) -> Self {
        Self { identity, users }
    }

    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<AuthSession> {
        let mut session = self
            .identity
            .sign_up(email, password)
            .await
            .map_err(|e| auth_failure("sign_up", e))?;

        if let Some(name) = display_name.map(str::trim).filter(|n| !n.is_empty()) {
            match self.identity.update_profile(&session.id_token, name).await {
                Ok(user) => session.user = user,
                Err(e) => {
                    tracing::warn!(uid = %session.user.uid, error = %e, "Failed to set display name");
                }
            }
        }

        self.sync_profile(&session).await;
        tracing::info!(uid = %session.user.uid, "User signed up");
        Ok(session)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession> {
        let session = self
            .identity
            .sign_in(email, password)
            .await
            .map_err(|e| auth_failure("sign_in", e))?;

        self.sync_profile(&session).await;
        tracing::info!(uid = %session.user.uid, "User signed in");
        Ok(session)
    }

    pub async fn sign_in_with_provider(
        &self,
        provider: OAuthProvider,
        credential: &str,
    ) -> Result<AuthSession> {
        let session = self
            .identity
            .sign_in_with_idp(provider, credential)
            .await
            .map_err(|e| auth_failure("sign_in_with_provider", e))?;

        self.sync_profile(&session).await;
        tracing::info!(
            uid = %session.user.uid,
            provider = provider.name(),
            "User signed in with provider"
        );
        Ok(session)
    }

    pub async fn reset_password(&self, email: &str) -> Result<()> {
        self.identity
            .send_password_reset(email)
            .await
            .map_err(|e| auth_failure("reset_password", e))?;
        tracing::info!("Password reset email requested");
        Ok(())
    }

    async fn sync_profile(&self, session: &AuthSession) {
        if let Err(e) = self.users.create_user_profile(&session.user).await {
            tracing::warn!(uid = %session.user.uid, error = %e, "Failed to upsert user profile");
        }
    }
}
