// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User profile service.
//!
//! Profiles mirror the identity provider's user record and add app-owned
//! fields (`bio`, sign-in bookkeeping). They are upserted on every sign-in.

use crate::db::Datastore;
use crate::error::{AppError, Result};
use crate::models::events::{Event, UserCreatedData, UserUpdatedData};
use crate::models::{AuthUser, ProfileUpdate, UserMetadata, UserPatch, UserProfile};
use crate::services::workflow::WorkflowClient;
use crate::time_utils;
use serde_json::{Map, Value};
use std::sync::Arc;
use validator::Validate;

pub struct UserService {
    db: Arc<dyn Datastore>,
    workflow: WorkflowClient,
}

impl UserService {
    pub fn new(db: Arc<dyn Datastore>, workflow: WorkflowClient) -> Self {
        Self { db, workflow }
    }

    /// Create the profile for a newly seen user, or refresh the identity
    /// fields and login time of an existing one.
    ///
    /// `bio`, `createdAt` and the recorded sign-up method survive a refresh.
    pub async fn create_user_profile(&self, user: &AuthUser) -> Result<UserProfile> {
        if let Some(mut existing) = self.db.get_user(&user.uid).await? {
            if existing.uid.is_empty() {
                return Err(AppError::Internal(anyhow::anyhow!(
                    "stored profile {} has no uid field",
                    user.uid
                )));
            }

            let now = time_utils::now_after(existing.updated_at);
            let patch = UserPatch {
                email: Some(user.email.clone().unwrap_or_default()),
                display_name: Some(user.display_name.clone().unwrap_or_default()),
                photo_url: Some(user.photo_url.clone().unwrap_or_default()),
                email_verified: Some(user.email_verified),
                last_login_at: Some(now),
                ..UserPatch::touch(now)
            };
            self.db.update_user(&user.uid, &patch).await?;
            patch.apply(&mut existing);

            tracing::info!(uid = %user.uid, "User profile updated on sign-in");
            return Ok(existing);
        }

        let now = time_utils::now();
        let profile = UserProfile {
            uid: user.uid.clone(),
            email: user.email.clone().unwrap_or_default(),
            display_name: user.display_name.clone().unwrap_or_default(),
            photo_url: user.photo_url.clone().unwrap_or_default(),
            email_verified: user.email_verified,
            bio: String::new(),
            created_at: now,
            updated_at: now,
            metadata: UserMetadata {
                last_login_at: now,
                sign_up_method: user.sign_up_method(),
            },
        };
        self.db.create_user(&profile).await?;

        tracing::info!(
            uid = %profile.uid,
            sign_up_method = %profile.metadata.sign_up_method,
            "User profile created"
        );

        self.workflow
            .publish(Event::UserCreated(UserCreatedData {
                uid: profile.uid.clone(),
                email: profile.email.clone(),
                display_name: user.display_name.clone(),
                sign_up_method: profile.metadata.sign_up_method.clone(),
            }))
            .await;

        Ok(profile)
    }

    pub async fn get_user_profile(&self, uid: &str) -> Result<UserProfile> {
        self.db
            .get_user(uid)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user {uid}")))
    }

    /// Apply a partial update. `updatedAt` always moves forward; `uid` is
    /// never writable.
    pub async fn update_user_profile(
        &self,
        uid: &str,
        update: ProfileUpdate,
    ) -> Result<UserProfile> {
        update.validate()?;

        let mut profile = self.get_user_profile(uid).await?;

        let patch = UserPatch {
            display_name: update.display_name.clone(),
            photo_url: update.photo_url.clone(),
            bio: update.bio.clone(),
            ..UserPatch::touch(time_utils::now_after(profile.updated_at))
        };
        self.db.update_user(uid, &patch).await?;
        patch.apply(&mut profile);

        tracing::info!(uid, fields = ?update.field_names(), "User profile updated");

        self.workflow
            .publish(Event::UserUpdated(UserUpdatedData {
                uid: uid.to_string(),
                updates: changed_fields(&update),
            }))
            .await;

        Ok(profile)
    }
}

fn changed_fields(update: &ProfileUpdate) -> Map<String, Value> {
    let mut map = Map::new();
    if let Some(v) = &update.display_name {
        map.insert("displayName".to_string(), Value::String(v.clone()));
    }
    if let Some(v) = &update.photo_url {
        map.insert("photoURL".to_string(), Value::String(v.clone()));
    }
    if let Some(v) = &update.bio {
        map.insert("bio".to_string(), Value::String(v.clone()));
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db::MemoryDb;

    fn service() -> UserService {
        let config = Config::test_default();
        UserService::new(
            Arc::new(MemoryDb::new()),
            WorkflowClient::new(&config.workflow).unwrap(),
        )
    }

    fn auth_user(provider: Option<&str>) -> AuthUser {
        AuthUser {
            uid: "uid-1".to_string(),
            email: Some("one@example.com".to_string()),
            display_name: Some("One".to_string()),
            photo_url: None,
            email_verified: false,
            provider_id: provider.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn new_profile_records_sign_up_method() {
        let svc = service();
        let profile = svc
            .create_user_profile(&auth_user(Some("github.com")))
            .await
            .unwrap();
        assert_eq!(profile.metadata.sign_up_method, "github.com");
        assert_eq!(profile.bio, "");
        assert_eq!(profile.created_at, profile.updated_at);
    }

    #[tokio::test]
    async fn sign_in_again_preserves_bio_and_created_at() {
        let svc = service();
        let first = svc.create_user_profile(&auth_user(None)).await.unwrap();
        svc.update_user_profile(
            "uid-1",
            ProfileUpdate {
                bio: Some("hi".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let mut user = auth_user(Some("google.com"));
        user.email_verified = true;
        let again = svc.create_user_profile(&user).await.unwrap();

        assert_eq!(again.bio, "hi");
        assert_eq!(again.created_at, first.created_at);
        assert_eq!(again.metadata.sign_up_method, "email");
        assert!(again.email_verified);
        assert!(again.updated_at > first.updated_at);
        assert_eq!(again.metadata.last_login_at, again.updated_at);
    }

    #[tokio::test]
    async fn update_missing_profile_is_not_found() {
        let svc = service();
        let err = svc
            .update_user_profile("nobody", ProfileUpdate::default())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn oversized_bio_rejected() {
        let svc = service();
        svc.create_user_profile(&auth_user(None)).await.unwrap();
        let err = svc
            .update_user_profile(
                "uid-1",
                ProfileUpdate {
                    bio: Some("x".repeat(1001)),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
