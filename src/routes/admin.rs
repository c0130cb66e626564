// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Admin-only routes. Callers need the `admin` custom claim.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::error::Result;
use crate::middleware::CurrentUser;
use crate::models::events::HelloWorldData;
use crate::models::{AuthUser, Event};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/admin/users", get(find_user))
        .route("/api/admin/users/{uid}", delete(delete_user))
        .route("/api/admin/users/{uid}/claims", post(set_claims))
        .route("/api/admin/users/{uid}/custom-token", post(custom_token))
        .route("/api/admin/events/hello", post(send_hello))
}

#[derive(Deserialize)]
pub struct FindUserParams {
    email: String,
}

async fn find_user(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FindUserParams>,
) -> Result<Json<AuthUser>> {
    Ok(Json(state.admin.get_user_by_email(&params.email).await?))
}

async fn delete_user(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<CurrentUser>,
    Path(uid): Path<String>,
) -> Result<StatusCode> {
    tracing::info!(admin = %admin.uid, uid = %uid, "Admin deleting user");
    state.admin.delete_user(&uid).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct ClaimsRequest {
    claims: Map<String, Value>,
}

async fn set_claims(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<String>,
    Json(body): Json<ClaimsRequest>,
) -> Result<StatusCode> {
    state.admin.set_custom_user_claims(&uid, &body.claims).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Default, Deserialize)]
pub struct CustomTokenRequest {
    #[serde(default)]
    claims: Option<Map<String, Value>>,
}

#[derive(Serialize)]
pub struct CustomTokenResponse {
    token: String,
}

async fn custom_token(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<String>,
    body: Option<Json<CustomTokenRequest>>,
) -> Result<Json<CustomTokenResponse>> {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let token = state.admin.create_custom_token(&uid, body.claims.as_ref())?;
    Ok(Json(CustomTokenResponse { token }))
}

#[derive(Serialize)]
pub struct SentEventsResponse {
    ids: Vec<String>,
}

/// Send a `test/hello.world` event, addressed to the caller unless an email
/// is given.
async fn send_hello(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<CurrentUser>,
    body: Option<Json<HelloWorldData>>,
) -> Result<Json<SentEventsResponse>> {
    let email = match body {
        Some(Json(data)) => data.email,
        None => admin.email.clone().unwrap_or_default(),
    };
    let ids = state
        .workflow
        .send(&Event::HelloWorld(HelloWorldData { email }))
        .await?;
    Ok(Json(SentEventsResponse { ids }))
}
