//! User profile model for storage and API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

/// User profile, one per authenticated user (document id = uid).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserProfile {
    pub uid: String,
    pub email: String,
    pub display_name: String,
    #[serde(rename = "photoURL")]
    pub photo_url: String,
    pub email_verified: bool,
    pub bio: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub metadata: UserMetadata,
}

/// Sign-in bookkeeping nested under `metadata`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserMetadata {
    pub last_login_at: DateTime<Utc>,
    pub sign_up_method: String,
}

/// Fields a user may edit on their own profile.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[validate(length(max = 100))]
    pub display_name: Option<String>,
    #[serde(rename = "photoURL")]
    #[validate(length(max = 2048))]
    pub photo_url: Option<String>,
    #[validate(length(max = 1000))]
    pub bio: Option<String>,
}

impl ProfileUpdate {
    /// Names of the fields this update touches, in wire form.
    pub fn field_names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.display_name.is_some() {
            names.push("displayName");
        }
        if self.photo_url.is_some() {
            names.push("photoURL");
        }
        if self.bio.is_some() {
            names.push("bio");
        }
        names
    }

    pub fn is_empty(&self) -> bool {
        self.field_names().is_empty()
    }
}

/// Partial write to a stored profile. `None` leaves a field untouched.
#[derive(Debug, Clone)]
pub struct UserPatch {
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    pub email_verified: Option<bool>,
    pub bio: Option<String>,
    pub updated_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl UserPatch {
    /// A patch that only advances `updatedAt`.
    pub fn touch(updated_at: DateTime<Utc>) -> Self {
        Self {
            email: None,
            display_name: None,
            photo_url: None,
            email_verified: None,
            bio: None,
            updated_at,
            last_login_at: None,
        }
    }

    /// Document field paths written by this patch.
    pub fn field_paths(&self) -> Vec<&'static str> {
        let mut paths = Vec::new();
        if self.email.is_some() {
            paths.push("email");
        }
        if self.display_name.is_some() {
            paths.push("displayName");
        }
        if self.photo_url.is_some() {
            paths.push("photoURL");
        }
        if self.email_verified.is_some() {
            paths.push("emailVerified");
        }
        if self.bio.is_some() {
            paths.push("bio");
        }
        paths.push("updatedAt");
        if self.last_login_at.is_some() {
            paths.push("metadata.lastLoginAt");
        }
        paths
    }

    /// Apply the patch to an in-memory profile.
    pub fn apply(&self, profile: &mut UserProfile) {
        if let Some(email) = &self.email {
            profile.email = email.clone();
        }
        if let Some(name) = &self.display_name {
            profile.display_name = name.clone();
        }
        if let Some(photo) = &self.photo_url {
            profile.photo_url = photo.clone();
        }
        if let Some(verified) = self.email_verified {
            profile.email_verified = verified;
        }
        if let Some(bio) = &self.bio {
            profile.bio = bio.clone();
        }
        profile.updated_at = self.updated_at;
        if let Some(at) = self.last_login_at {
            profile.metadata.last_login_at = at;
        }
    }
}
