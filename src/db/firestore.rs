// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (profile storage, keyed by uid)
//! - Posts (blog posts, database-assigned ids)

use async_trait::async_trait;
use firestore::errors::FirestoreError;
use firestore::{FirestoreQueryDirection, FirestoreWritePrecondition};

use crate::config::Config;
use crate::db::collections;
use crate::db::converters::{
    PostDocument, PostPatchDocument, UserDocument, UserPatchDocument,
};
use crate::db::Datastore;
use crate::error::AppError;
use crate::models::post::SortDirection;
use crate::models::{NewPost, Post, PostPatch, PostQuery, UserPatch, UserProfile};

const TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: firestore::FirestoreDb,
}

impl FirestoreDb {
    /// Create a new Firestore client authenticated with the configured
    /// service account.
    ///
    /// Connects to the emulator instead when `firestore_emulator_host` is set.
    pub async fn new(config: &Config) -> Result<Self, AppError> {
        let project_id = config.firebase_project_id.as_str();

        // The emulator accepts any token; skip real credentials entirely.
        if let Some(host) = &config.firestore_emulator_host {
            return Self::create_emulator_client(project_id, host).await;
        }

        let credentials = serde_json::json!({
            "type": "service_account",
            "project_id": project_id,
            "private_key_id": "",
            "private_key": config.firebase_private_key,
            "client_email": config.firebase_client_email,
            "client_id": "",
            "token_uri": TOKEN_URI,
        })
        .to_string();

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());
        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::Json(credentials),
        )
        .await
        .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self { client })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str, host: &str) -> Result<Self, AppError> {
        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new("owner".to_string().into()),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string())
            .with_firebase_api_url(format!("http://{host}"));

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(project = project_id, "Connected to Firestore (Emulator)");

        Ok(Self { client })
    }

}

fn db_error(e: FirestoreError) -> AppError {
    AppError::Database(e.to_string())
}

/// Writes guarded by an `exists` precondition report a missing document as
/// NOT_FOUND; surface that as a domain error rather than a database failure.
fn update_error(kind: &str, id: &str, e: FirestoreError) -> AppError {
    match e {
        FirestoreError::DataNotFoundError(_) => AppError::NotFound(format!("{kind} {id}")),
        other => db_error(other),
    }
}

#[async_trait]
impl Datastore for FirestoreDb {
    // ─── User Operations ─────────────────────────────────────────

    async fn get_user(&self, uid: &str) -> Result<Option<UserProfile>, AppError> {
        let doc: Option<UserDocument> = self
            .client
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(uid)
            .await
            .map_err(db_error)?;
        Ok(doc.map(UserDocument::into_profile))
    }

    async fn create_user(&self, profile: &UserProfile) -> Result<(), AppError> {
        let _: () = self
            .client
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&profile.uid)
            .object(&UserDocument::from(profile))
            .execute()
            .await
            .map_err(db_error)?;
        Ok(())
    }

    async fn update_user(&self, uid: &str, patch: &UserPatch) -> Result<(), AppError> {
        let _: () = self
            .client
            .fluent()
            .update()
            .fields(patch.field_paths())
            .in_col(collections::USERS)
            .precondition(FirestoreWritePrecondition::Exists(true))
            .document_id(uid)
            .object(&UserPatchDocument::from(patch))
            .execute()
            .await
            .map_err(|e| update_error("user", uid, e))?;
        Ok(())
    }

    // ─── Post Operations ─────────────────────────────────────────

    async fn create_post(&self, post: NewPost) -> Result<Post, AppError> {
        let stored: PostDocument = self
            .client
            .fluent()
            .insert()
            .into(collections::POSTS)
            .generate_document_id()
            .object(&PostDocument::from(&post))
            .execute()
            .await
            .map_err(db_error)?;

        let id = stored
            .id
            .ok_or_else(|| AppError::Database("insert returned no document id".to_string()))?;
        Ok(post.into_post(id))
    }

    async fn get_post(&self, id: &str) -> Result<Option<Post>, AppError> {
        let doc: Option<PostDocument> = self
            .client
            .fluent()
            .select()
            .by_id_in(collections::POSTS)
            .obj()
            .one(id)
            .await
            .map_err(db_error)?;
        Ok(doc.map(|d| d.into_post(id)))
    }

    async fn list_posts(&self, query: &PostQuery) -> Result<Vec<Post>, AppError> {
        let select = self
            .client
            .fluent()
            .select()
            .from(collections::POSTS);

        // Filtering by author while ordering by a timestamp needs a composite
        // index on (authorId, <order field>).
        let select = match &query.author_id {
            Some(author_id) => {
                let author_id = author_id.clone();
                select.filter(move |q| q.field("authorId").eq(author_id.clone()))
            }
            None => select,
        };

        let direction = match query.direction {
            SortDirection::Asc => FirestoreQueryDirection::Ascending,
            SortDirection::Desc => FirestoreQueryDirection::Descending,
        };
        let select = select.order_by([(query.order_by.field_path(), direction)]);

        let select = match query.limit {
            Some(limit) => select.limit(limit),
            None => select,
        };

        let docs: Vec<PostDocument> = select.obj().query().await.map_err(db_error)?;
        Ok(docs.into_iter().map(|d| d.into_post("")).collect())
    }

    async fn update_post(&self, id: &str, patch: &PostPatch) -> Result<(), AppError> {
        let _: () = self
            .client
            .fluent()
            .update()
            .fields(patch.field_paths())
            .in_col(collections::POSTS)
            .precondition(FirestoreWritePrecondition::Exists(true))
            .document_id(id)
            .object(&PostPatchDocument::from(patch))
            .execute()
            .await
            .map_err(|e| update_error("post", id, e))?;
        Ok(())
    }

    async fn delete_post(&self, id: &str) -> Result<(), AppError> {
        self.client
            .fluent()
            .delete()
            .from(collections::POSTS)
            .document_id(id)
            .execute()
            .await
            .map_err(db_error)?;
        Ok(())
    }
}
