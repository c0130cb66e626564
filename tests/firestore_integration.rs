// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore integration tests.
//!
//! These tests require the Firestore emulator to be running.
//! Run with FIRESTORE_EMULATOR_HOST pointing at a local emulator.
//!
//! The emulator provides a clean state for each test run.

use chrono::{TimeZone, Utc};
use inkwell_api::db::Datastore;
use inkwell_api::models::post::{PostOrderField, SortDirection};
use inkwell_api::models::{NewPost, PostAuthor, PostPatch, PostQuery, UserMetadata, UserPatch, UserProfile};

mod common;
use common::test_db;

/// Unique id for test isolation.
fn unique_id(prefix: &str) -> String {
    format!("{prefix}-{}", uuid::Uuid::new_v4().simple())
}

fn test_profile(uid: &str) -> UserProfile {
    let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
    UserProfile {
        uid: uid.to_string(),
        email: "test@example.com".to_string(),
        display_name: "Test User".to_string(),
        photo_url: String::new(),
        email_verified: false,
        bio: String::new(),
        created_at: now,
        updated_at: now,
        metadata: UserMetadata {
            last_login_at: now,
            sign_up_method: "email".to_string(),
        },
    }
}

fn new_post(author_id: &str, title: &str, minute: u32) -> NewPost {
    let at = Utc.with_ymd_and_hms(2026, 3, 1, 12, minute, 0).unwrap();
    NewPost {
        title: title.to_string(),
        content: format!("Body of {title}"),
        author_id: author_id.to_string(),
        author: PostAuthor {
            uid: author_id.to_string(),
            display_name: "Test User".to_string(),
            photo_url: String::new(),
        },
        created_at: at,
        updated_at: at,
    }
}

#[tokio::test]
async fn test_user_round_trip_and_patch() {
    require_emulator!();
    let db = test_db().await;
    let uid = unique_id("user");

    assert!(db.get_user(&uid).await.unwrap().is_none());

    let profile = test_profile(&uid);
    db.create_user(&profile).await.unwrap();
    assert_eq!(db.get_user(&uid).await.unwrap(), Some(profile.clone()));

    let later = profile.updated_at + chrono::Duration::minutes(5);
    let patch = UserPatch {
        bio: Some("Hello".to_string()),
        ..UserPatch::touch(later)
    };
    db.update_user(&uid, &patch).await.unwrap();

    let stored = db.get_user(&uid).await.unwrap().unwrap();
    assert_eq!(stored.bio, "Hello");
    assert_eq!(stored.display_name, "Test User");
    assert_eq!(stored.updated_at, later);
    assert_eq!(stored.created_at, profile.created_at);
}

#[tokio::test]
async fn test_update_missing_user_is_not_found() {
    require_emulator!();
    let db = test_db().await;

    let err = db
        .update_user(&unique_id("nobody"), &UserPatch::touch(Utc::now()))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_post_lifecycle() {
    require_emulator!();
    let db = test_db().await;
    let author = unique_id("author");

    let post = db.create_post(new_post(&author, "Lifecycle", 0)).await.unwrap();
    assert!(!post.id.is_empty());
    assert_eq!(db.get_post(&post.id).await.unwrap(), Some(post.clone()));

    let patch = PostPatch {
        title: Some("Renamed".to_string()),
        content: None,
        updated_at: post.updated_at + chrono::Duration::minutes(1),
    };
    db.update_post(&post.id, &patch).await.unwrap();
    let stored = db.get_post(&post.id).await.unwrap().unwrap();
    assert_eq!(stored.title, "Renamed");
    assert_eq!(stored.content, post.content);

    db.delete_post(&post.id).await.unwrap();
    assert!(db.get_post(&post.id).await.unwrap().is_none());

    let err = db.update_post(&post.id, &patch).await.unwrap_err();
    assert!(err.is_not_found());
}

/// Needs the composite index on (authorId, createdAt).
#[tokio::test]
async fn test_list_posts_by_author() {
    require_emulator!();
    let db = test_db().await;
    let author = unique_id("author");
    let other = unique_id("author");

    db.create_post(new_post(&author, "first", 1)).await.unwrap();
    db.create_post(new_post(&other, "elsewhere", 2)).await.unwrap();
    db.create_post(new_post(&author, "second", 3)).await.unwrap();

    let newest_first = db.list_posts(&PostQuery::by_author(&author)).await.unwrap();
    let titles: Vec<_> = newest_first.iter().map(|p| p.title.as_str()).collect();
    assert_eq!(titles, ["second", "first"]);

    let oldest_first = db
        .list_posts(&PostQuery {
            author_id: Some(author.clone()),
            limit: Some(1),
            order_by: PostOrderField::CreatedAt,
            direction: SortDirection::Asc,
        })
        .await
        .unwrap();
    assert_eq!(oldest_first.len(), 1);
    assert_eq!(oldest_first[0].title, "first");
}

#[tokio::test]
async fn test_sign_in_refresh_keeps_sign_up_method() {
    require_emulator!();
    let db = test_db().await;
    let uid = unique_id("returning");

    let profile = test_profile(&uid);
    db.create_user(&profile).await.unwrap();

    let login = profile.created_at + chrono::Duration::hours(2);
    let patch = UserPatch {
        email_verified: Some(true),
        last_login_at: Some(login),
        ..UserPatch::touch(login)
    };
    db.update_user(&uid, &patch).await.unwrap();

    let stored = db.get_user(&uid).await.unwrap().unwrap();
    assert!(stored.email_verified);
    assert_eq!(stored.metadata.last_login_at, login);
    assert_eq!(stored.metadata.sign_up_method, "email");
    assert_eq!(stored.bio, profile.bio);
}
