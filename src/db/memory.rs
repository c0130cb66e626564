//! In-memory datastore.
//!
//! Suitable for local development and tests. Data lives only as long as the
//! process and is not shared between replicas.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

use crate::db::Datastore;
use crate::error::AppError;
use crate::models::post::SortDirection;
use crate::models::{NewPost, Post, PostPatch, PostQuery, UserPatch, UserProfile};

#[derive(Clone, Default)]
pub struct MemoryDb {
    users: Arc<DashMap<String, UserProfile>>,
    posts: Arc<DashMap<String, Post>>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Datastore for MemoryDb {
    async fn get_user(&self, uid: &str) -> Result<Option<UserProfile>, AppError> {
        Ok(self.users.get(uid).map(|u| u.clone()))
    }

    async fn create_user(&self, profile: &UserProfile) -> Result<(), AppError> {
        self.users.insert(profile.uid.clone(), profile.clone());
        Ok(())
    }

    async fn update_user(&self, uid: &str, patch: &UserPatch) -> Result<(), AppError> {
        let mut entry = self
            .users
            .get_mut(uid)
            .ok_or_else(|| AppError::NotFound(format!("user {uid}")))?;
        patch.apply(&mut entry);
        Ok(())
    }

    async fn create_post(&self, post: NewPost) -> Result<Post, AppError> {
        let id = uuid::Uuid::new_v4().simple().to_string();
        let post = post.into_post(id.clone());
        self.posts.insert(id, post.clone());
        Ok(post)
    }

    async fn get_post(&self, id: &str) -> Result<Option<Post>, AppError> {
        Ok(self.posts.get(id).map(|p| p.clone()))
    }

    async fn list_posts(&self, query: &PostQuery) -> Result<Vec<Post>, AppError> {
        let mut posts: Vec<Post> = self
            .posts
            .iter()
            .filter(|p| {
                query
                    .author_id
                    .as_deref()
                    .is_none_or(|author| p.author_id == author)
            })
            .map(|p| p.value().clone())
            .collect();

        posts.sort_by(|a, b| {
            let ord = query
                .sort_key(a)
                .cmp(&query.sort_key(b))
                .then_with(|| a.id.cmp(&b.id));
            match query.direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            }
        });

        if let Some(limit) = query.limit {
            posts.truncate(limit as usize);
        }
        Ok(posts)
    }

    async fn update_post(&self, id: &str, patch: &PostPatch) -> Result<(), AppError> {
        let mut entry = self
            .posts
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound(format!("post {id}")))?;
        patch.apply(&mut entry);
        Ok(())
    }

    async fn delete_post(&self, id: &str) -> Result<(), AppError> {
        self.posts.remove(id);
        Ok(())
    }
}
