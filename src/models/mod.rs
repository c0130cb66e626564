// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod auth;
pub mod events;
pub mod post;
pub mod user;

pub use auth::{AuthErrorCode, AuthSession, AuthUser, OAuthProvider};
pub use events::{Event, EventEnvelope};
pub use post::{
    CreatePostInput, NewPost, Post, PostAuthor, PostPatch, PostQuery, UpdatePostInput,
};
pub use user::{ProfileUpdate, UserMetadata, UserPatch, UserProfile};
