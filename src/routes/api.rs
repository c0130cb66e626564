// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! JSON API routes: profile, posts and client configuration.

use crate::config::ClientConfig;
use crate::error::{AppError, Result};
use crate::middleware::CurrentUser;
use crate::models::post::{PostOrderField, SortDirection};
use crate::models::{
    CreatePostInput, Post, PostAuthor, PostQuery, ProfileUpdate, UpdatePostInput, UserProfile,
};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

/// Most posts returned by one listing.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Routes anyone may call.
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/config/client", get(get_client_config))
        .route("/api/posts", get(list_posts))
        .route("/api/posts/{id}", get(get_post))
}

/// Routes that need a signed-in caller. The auth middleware is applied in
/// routes/mod.rs.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/me", get(get_me).patch(update_me))
        .route("/api/posts", axum::routing::post(create_post))
        .route(
            "/api/posts/{id}",
            axum::routing::patch(update_post).delete(delete_post),
        )
}

async fn get_client_config(State(state): State<Arc<AppState>>) -> Json<ClientConfig> {
    Json(state.config.client.clone())
}

// ─── User Profile ────────────────────────────────────────────

async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<UserProfile>> {
    Ok(Json(state.users.get_user_profile(&user.uid).await?))
}

async fn update_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<UserProfile>> {
    Ok(Json(state.users.update_user_profile(&user.uid, update).await?))
}

// ─── Posts ───────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPostsParams {
    author_id: Option<String>,
    limit: Option<u32>,
    order_by: Option<PostOrderField>,
    direction: Option<SortDirection>,
}

impl ListPostsParams {
    fn into_query(self) -> Result<PostQuery> {
        let limit = match self.limit {
            Some(0) => return Err(AppError::BadRequest("limit must be positive".to_string())),
            Some(n) => n.min(MAX_PAGE_SIZE),
            None => MAX_PAGE_SIZE,
        };
        Ok(PostQuery {
            author_id: self.author_id.filter(|a| !a.is_empty()),
            limit: Some(limit),
            order_by: self.order_by.unwrap_or_default(),
            direction: self.direction.unwrap_or_default(),
        })
    }
}

async fn list_posts(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListPostsParams>,
) -> Result<Json<Vec<Post>>> {
    let query = params.into_query()?;
    Ok(Json(state.posts.get_posts(&query).await?))
}

async fn get_post(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Post>> {
    Ok(Json(state.posts.get_post(&id).await?))
}

#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    title: String,
    content: String,
}

/// Create a post authored by the caller. The author block is a snapshot of
/// the caller's profile at this moment.
async fn create_post(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Json(body): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<Post>)> {
    let author = match state.users.get_user_profile(&user.uid).await {
        Ok(profile) => PostAuthor {
            uid: profile.uid,
            display_name: profile.display_name,
            photo_url: profile.photo_url,
        },
        Err(e) if e.is_not_found() => PostAuthor {
            uid: user.uid.clone(),
            display_name: user.name.clone().unwrap_or_default(),
            photo_url: user.picture.clone().unwrap_or_default(),
        },
        Err(e) => return Err(e),
    };

    let post = state
        .posts
        .create_post(CreatePostInput {
            title: body.title,
            content: body.content,
            author_id: user.uid.clone(),
            author,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(post)))
}

/// Only the author may change or remove a post.
async fn ensure_author(state: &AppState, id: &str, user: &CurrentUser) -> Result<()> {
    let post = state.posts.get_post(id).await?;
    if post.author_id != user.uid {
        tracing::warn!(post_id = id, uid = %user.uid, "Caller is not the post author");
        return Err(AppError::Forbidden("only the author may modify this post".to_string()));
    }
    Ok(())
}

async fn update_post(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(update): Json<UpdatePostInput>,
) -> Result<Json<Post>> {
    ensure_author(&state, &id, &user).await?;
    Ok(Json(state.posts.update_post(&id, update).await?))
}

async fn delete_post(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    ensure_author(&state, &id, &user).await?;
    state.posts.delete_post(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_params_defaults_and_cap() {
        let q = ListPostsParams::default().into_query().unwrap();
        assert_eq!(q.limit, Some(MAX_PAGE_SIZE));
        assert_eq!(q.order_by, PostOrderField::CreatedAt);
        assert_eq!(q.direction, SortDirection::Desc);

        let q = ListPostsParams {
            limit: Some(500),
            author_id: Some(String::new()),
            ..Default::default()
        }
        .into_query()
        .unwrap();
        assert_eq!(q.limit, Some(MAX_PAGE_SIZE));
        assert!(q.author_id.is_none());

        let err = ListPostsParams {
            limit: Some(0),
            ..Default::default()
        }
        .into_query()
        .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
