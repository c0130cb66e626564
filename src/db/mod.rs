//! Database layer (Firestore, or in-memory for local runs and tests).

mod converters;
pub mod firestore;
pub mod memory;

use async_trait::async_trait;

use crate::error::AppError;
use crate::models::{NewPost, Post, PostPatch, PostQuery, UserPatch, UserProfile};

pub use firestore::FirestoreDb;
pub use memory::MemoryDb;

/// Collection names as constants.
pub mod collections {
    /// User profiles (keyed by uid)
    pub const USERS: &str = "users";
    /// Blog posts (database-assigned ids)
    pub const POSTS: &str = "posts";
}

/// Document store operations. Each call is a single round trip to the backend.
#[async_trait]
pub trait Datastore: Send + Sync {
    async fn get_user(&self, uid: &str) -> Result<Option<UserProfile>, AppError>;

    /// Write a complete profile, replacing any existing document.
    async fn create_user(&self, profile: &UserProfile) -> Result<(), AppError>;

    /// Write only the fields present in `patch`. Fails with `NotFound` if the
    /// document does not exist.
    async fn update_user(&self, uid: &str, patch: &UserPatch) -> Result<(), AppError>;

    /// Insert a post, letting the backend assign its id.
    async fn create_post(&self, post: NewPost) -> Result<Post, AppError>;

    async fn get_post(&self, id: &str) -> Result<Option<Post>, AppError>;

    async fn list_posts(&self, query: &PostQuery) -> Result<Vec<Post>, AppError>;

    /// Write only the fields present in `patch`.
    async fn update_post(&self, id: &str, patch: &PostPatch) -> Result<(), AppError>;

    async fn delete_post(&self, id: &str) -> Result<(), AppError>;
}
