// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Admin route gating and operations.

use axum::http::StatusCode;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde_json::{json, Value};

mod common;
use common::{admin_token, body_json, create_test_app, json_request, send, sign_up, PUBLIC_PEM};

#[tokio::test]
async fn test_admin_routes_require_admin_claim() {
    let (app, _) = create_test_app();
    let (_, token) = sign_up(&app, "plain@example.com", None).await;

    let response = send(
        &app,
        json_request("GET", "/api/admin/users?email=plain@example.com", Some(&token), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = send(
        &app,
        json_request("GET", "/api/admin/users?email=plain@example.com", None, None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_find_user_by_email() {
    let (app, _) = create_test_app();
    let (uid, _) = sign_up(&app, "findme@example.com", None).await;
    let admin = admin_token("admin-1");

    let response = send(
        &app,
        json_request("GET", "/api/admin/users?email=findme@example.com", Some(&admin), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["uid"], uid.as_str());

    let response = send(
        &app,
        json_request("GET", "/api/admin/users?email=missing@example.com", Some(&admin), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_granted_claims_appear_after_next_sign_in() {
    let (app, state) = create_test_app();
    let (uid, _) = sign_up(&app, "promoted@example.com", None).await;
    let admin = admin_token("admin-1");

    let response = send(
        &app,
        json_request(
            "POST",
            &format!("/api/admin/users/{uid}/claims"),
            Some(&admin),
            Some(json!({"claims": {"admin": true}})),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = send(
        &app,
        json_request(
            "POST",
            "/auth/sign-in",
            None,
            Some(json!({"email": "promoted@example.com", "password": "correct-horse"})),
        ),
    )
    .await;
    let token = body_json(response).await["idToken"]
        .as_str()
        .unwrap()
        .to_string();

    let decoded = state.token_verifier.verify_id_token(&token).await.unwrap();
    assert!(decoded.is_admin());

    let response = send(
        &app,
        json_request("GET", "/api/admin/users?email=promoted@example.com", Some(&token), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_reserved_claims_rejected() {
    let (app, _) = create_test_app();
    let (uid, _) = sign_up(&app, "reserved@example.com", None).await;

    let response = send(
        &app,
        json_request(
            "POST",
            &format!("/api/admin/users/{uid}/claims"),
            Some(&admin_token("admin-1")),
            Some(json!({"claims": {"sub": "someone-else"}})),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_custom_token() {
    let (app, _) = create_test_app();

    let response = send(
        &app,
        json_request(
            "POST",
            "/api/admin/users/some-user/custom-token",
            Some(&admin_token("admin-1")),
            Some(json!({"claims": {"premium": true}})),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let token = body_json(response).await["token"]
        .as_str()
        .unwrap()
        .to_string();

    let mut validation = Validation::new(Algorithm::RS256);
    validation.set_audience(&[
        "https://identitytoolkit.googleapis.com/google.identity.identitytoolkit.v1.IdentityToolkit",
    ]);
    let claims = decode::<Value>(
        &token,
        &DecodingKey::from_rsa_pem(PUBLIC_PEM.as_bytes()).unwrap(),
        &validation,
    )
    .unwrap()
    .claims;
    assert_eq!(claims["uid"], "some-user");
    assert_eq!(claims["claims"]["premium"], true);
}

#[tokio::test]
async fn test_delete_user() {
    let (app, _) = create_test_app();
    let (uid, _) = sign_up(&app, "leaving@example.com", None).await;
    let admin = admin_token("admin-1");

    let response = send(
        &app,
        json_request("DELETE", &format!("/api/admin/users/{uid}"), Some(&admin), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = send(
        &app,
        json_request(
            "POST",
            "/auth/sign-in",
            None,
            Some(json!({"email": "leaving@example.com", "password": "correct-horse"})),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_hello_event_without_event_key() {
    let (app, _) = create_test_app();

    let response = send(
        &app,
        json_request(
            "POST",
            "/api/admin/events/hello",
            Some(&admin_token("admin-1")),
            Some(json!({"email": "friend@example.com"})),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["ids"], json!([]));

    let response = send(
        &app,
        json_request(
            "POST",
            "/api/admin/events/hello",
            Some(&admin_token("admin-1")),
            Some(json!({"email": "not-an-email"})),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
