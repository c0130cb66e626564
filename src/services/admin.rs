// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Privileged identity operations performed as the service account.

use crate::error::{AppError, Result};
use crate::models::AuthUser;
use crate::services::identity::IdentityProvider;
use crate::services::service_account::{validate_custom_claims, ServiceAccount};
use serde_json::{Map, Value};
use std::sync::Arc;

pub struct AdminService {
    identity: Arc<dyn IdentityProvider>,
    service_account: Arc<ServiceAccount>,
}

impl AdminService {
    pub fn new(identity: Arc<dyn IdentityProvider>, service_account: Arc<ServiceAccount>) -> Self {
        Self {
            identity,
            service_account,
        }
    }

    pub fn create_custom_token(
        &self,
        uid: &str,
        claims: Option<&Map<String, Value>>,
    ) -> Result<String> {
        self.service_account
            .create_custom_token(uid, claims)
            .map_err(|e| AppError::BadRequest(format!("{e:#}")))
    }

    /// Replace a user's custom claims. They appear in ID tokens issued after
    /// the user next refreshes.
    pub async fn set_custom_user_claims(
        &self,
        uid: &str,
        claims: &Map<String, Value>,
    ) -> Result<()> {
        validate_custom_claims(claims).map_err(|e| AppError::BadRequest(format!("{e:#}")))?;
        self.identity.set_custom_claims(uid, claims).await?;
        tracing::info!(uid, claims = ?claims.keys().collect::<Vec<_>>(), "Custom claims set");
        Ok(())
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<AuthUser> {
        self.identity
            .get_user_by_email(email)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user with email {email}")))
    }

    pub async fn delete_user(&self, uid: &str) -> Result<()> {
        self.identity.delete_user(uid).await?;
        tracing::info!(uid, "User account deleted");
        Ok(())
    }
}
