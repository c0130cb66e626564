// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Blog post service.

use crate::db::Datastore;
use crate::error::{AppError, Result};
use crate::models::events::{Event, PostCreatedData, PostDeletedData, PostUpdatedData};
use crate::models::{CreatePostInput, NewPost, Post, PostPatch, PostQuery, UpdatePostInput};
use crate::services::workflow::WorkflowClient;
use crate::time_utils;
use serde_json::{Map, Value};
use std::sync::Arc;
use validator::Validate;

pub struct PostService {
    db: Arc<dyn Datastore>,
    workflow: WorkflowClient,
}

impl PostService {
    pub fn new(db: Arc<dyn Datastore>, workflow: WorkflowClient) -> Self {
        Self { db, workflow }
    }

    pub async fn create_post(&self, input: CreatePostInput) -> Result<Post> {
        input.validate()?;

        let now = time_utils::now();
        let post = self
            .db
            .create_post(NewPost {
                title: input.title,
                content: input.content,
                author_id: input.author_id,
                author: input.author,
                created_at: now,
                updated_at: now,
            })
            .await?;

        tracing::info!(post_id = %post.id, author_id = %post.author_id, "Post created");

        self.workflow
            .publish(Event::PostCreated(PostCreatedData {
                post_id: post.id.clone(),
                author_id: post.author_id.clone(),
                title: post.title.clone(),
            }))
            .await;

        Ok(post)
    }

    pub async fn get_post(&self, id: &str) -> Result<Post> {
        let post = self
            .db
            .get_post(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("post {id}")))?;
        tracing::debug!(post_id = id, "Post retrieved");
        Ok(post)
    }

    pub async fn get_posts(&self, query: &PostQuery) -> Result<Vec<Post>> {
        let posts = self.db.list_posts(query).await?;
        tracing::debug!(
            count = posts.len(),
            author_id = ?query.author_id,
            "Posts retrieved"
        );
        Ok(posts)
    }

    /// Update the given fields of a post. The existence check and the write
    /// are separate round trips, so a concurrent delete can slip between them.
    pub async fn update_post(&self, id: &str, input: UpdatePostInput) -> Result<Post> {
        input.validate()?;

        let mut post = self.get_post(id).await?;

        let patch = PostPatch {
            title: input.title.clone(),
            content: input.content.clone(),
            updated_at: time_utils::now_after(post.updated_at),
        };
        self.db.update_post(id, &patch).await?;
        patch.apply(&mut post);

        tracing::info!(post_id = id, fields = ?input.field_names(), "Post updated");

        self.workflow
            .publish(Event::PostUpdated(PostUpdatedData {
                post_id: id.to_string(),
                author_id: post.author_id.clone(),
                updates: changed_fields(&input),
            }))
            .await;

        Ok(post)
    }

    /// Delete a post. Deleting a post that does not exist is an error.
    pub async fn delete_post(&self, id: &str) -> Result<()> {
        let post = self.get_post(id).await?;
        self.db.delete_post(id).await?;

        tracing::info!(post_id = id, "Post deleted");

        self.workflow
            .publish(Event::PostDeleted(PostDeletedData {
                post_id: id.to_string(),
                author_id: post.author_id,
            }))
            .await;

        Ok(())
    }
}

fn changed_fields(input: &UpdatePostInput) -> Map<String, Value> {
    let mut map = Map::new();
    if let Some(title) = &input.title {
        map.insert("title".to_string(), Value::String(title.clone()));
    }
    if let Some(content) = &input.content {
        map.insert("content".to_string(), Value::String(content.clone()));
    }
    map
}
