// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore document shapes and their conversion to domain models.
//!
//! Documents written by older clients may be missing fields; reads fill in
//! empty strings, `false`, sign-up method `"unknown"` and the current time for
//! absent timestamps. A missing `lastLoginAt` falls back to `createdAt`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{NewPost, Post, PostAuthor, PostPatch, UserMetadata, UserPatch, UserProfile};

fn unknown_method() -> String {
    "unknown".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UserDocument {
    #[serde(default)]
    pub uid: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default, rename = "photoURL")]
    pub photo_url: String,
    #[serde(default)]
    pub email_verified: bool,
    #[serde(default)]
    pub bio: String,
    #[serde(default, with = "firestore::serialize_as_optional_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "firestore::serialize_as_optional_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metadata: Option<MetadataDocument>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MetadataDocument {
    #[serde(
        default,
        with = "firestore::serialize_as_optional_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_login_at: Option<DateTime<Utc>>,
    #[serde(default = "unknown_method", skip_serializing_if = "String::is_empty")]
    pub sign_up_method: String,
}

impl From<&UserProfile> for UserDocument {
    fn from(p: &UserProfile) -> Self {
        Self {
            uid: p.uid.clone(),
            email: p.email.clone(),
            display_name: p.display_name.clone(),
            photo_url: p.photo_url.clone(),
            email_verified: p.email_verified,
            bio: p.bio.clone(),
            created_at: Some(p.created_at),
            updated_at: Some(p.updated_at),
            metadata: Some(MetadataDocument {
                last_login_at: Some(p.metadata.last_login_at),
                sign_up_method: p.metadata.sign_up_method.clone(),
            }),
        }
    }
}

impl UserDocument {
    pub fn into_profile(self) -> UserProfile {
        let now = Utc::now();
        let created_at = self.created_at.unwrap_or(now);
        let metadata = match self.metadata {
            Some(m) => UserMetadata {
                last_login_at: m.last_login_at.unwrap_or(created_at),
                sign_up_method: m.sign_up_method,
            },
            None => UserMetadata {
                last_login_at: created_at,
                sign_up_method: unknown_method(),
            },
        };
        UserProfile {
            uid: self.uid,
            email: self.email,
            display_name: self.display_name,
            photo_url: self.photo_url,
            email_verified: self.email_verified,
            bio: self.bio,
            created_at,
            updated_at: self.updated_at.unwrap_or(now),
            metadata,
        }
    }
}

/// Sparse user document for field-masked updates. Only fields named by
/// [`UserPatch::field_paths`] are serialized.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UserPatchDocument {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(rename = "photoURL", skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_verified: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MetadataDocument>,
}

impl From<&UserPatch> for UserPatchDocument {
    fn from(p: &UserPatch) -> Self {
        Self {
            email: p.email.clone(),
            display_name: p.display_name.clone(),
            photo_url: p.photo_url.clone(),
            email_verified: p.email_verified,
            bio: p.bio.clone(),
            updated_at: p.updated_at,
            metadata: p.last_login_at.map(|at| MetadataDocument {
                last_login_at: Some(at),
                sign_up_method: String::new(),
            }),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AuthorDocument {
    #[serde(default)]
    pub uid: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default, rename = "photoURL")]
    pub photo_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PostDocument {
    /// Document id, filled in by the firestore crate on reads. Never stored.
    #[serde(default, alias = "_firestore_id", skip_serializing)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub author_id: String,
    #[serde(default)]
    pub author: AuthorDocument,
    #[serde(default, with = "firestore::serialize_as_optional_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "firestore::serialize_as_optional_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<&NewPost> for PostDocument {
    fn from(p: &NewPost) -> Self {
        Self {
            id: None,
            title: p.title.clone(),
            content: p.content.clone(),
            author_id: p.author_id.clone(),
            author: AuthorDocument {
                uid: p.author.uid.clone(),
                display_name: p.author.display_name.clone(),
                photo_url: p.author.photo_url.clone(),
            },
            created_at: Some(p.created_at),
            updated_at: Some(p.updated_at),
        }
    }
}

impl PostDocument {
    /// Convert to a post. `fallback_id` is used when the read did not carry the
    /// document id.
    pub fn into_post(self, fallback_id: &str) -> Post {
        let now = Utc::now();
        Post {
            id: self.id.unwrap_or_else(|| fallback_id.to_string()),
            title: self.title,
            content: self.content,
            author_id: self.author_id,
            author: PostAuthor {
                uid: self.author.uid,
                display_name: self.author.display_name,
                photo_url: self.author.photo_url,
            },
            created_at: self.created_at.unwrap_or(now),
            updated_at: self.updated_at.unwrap_or(now),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PostPatchDocument {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl From<&PostPatch> for PostPatchDocument {
    fn from(p: &PostPatch) -> Self {
        Self {
            title: p.title.clone(),
            content: p.content.clone(),
            updated_at: p.updated_at,
        }
    }
}
