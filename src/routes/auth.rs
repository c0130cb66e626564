// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Email/password and OAuth sign-in routes.
//!
//! A successful sign-in stores the ID token in an HTTP-only session cookie and
//! also returns it, so non-browser clients can send it as a bearer token.

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::middleware::auth::{cleared_session_cookie, get_current_user, session_cookie};
use crate::models::{AuthSession, AuthUser, OAuthProvider};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/sign-up", post(sign_up))
        .route("/auth/sign-in", post(sign_in))
        .route("/auth/provider", post(sign_in_with_provider))
        .route("/auth/sign-out", post(sign_out))
        .route("/auth/password-reset", post(password_reset))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpRequest {
    email: String,
    password: String,
    #[serde(default)]
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    email: String,
    password: String,
}

#[derive(Debug, Deserialize)]
pub struct ProviderSignInRequest {
    provider: String,
    /// Provider-issued credential: a Google ID token or a GitHub access token.
    credential: String,
}

#[derive(Debug, Deserialize)]
pub struct PasswordResetRequest {
    email: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub user: AuthUser,
    pub id_token: String,
    pub refresh_token: String,
    pub expires_in: u64,
}

/// Set the session cookie and build the response body.
fn start_session(state: &AppState, jar: CookieJar, session: AuthSession) -> (CookieJar, Json<SessionResponse>) {
    let jar = jar.add(session_cookie(
        &state.config,
        session.id_token.clone(),
        session.expires_in,
    ));
    (
        jar,
        Json(SessionResponse {
            user: session.user,
            id_token: session.id_token,
            refresh_token: session.refresh_token,
            expires_in: session.expires_in,
        }),
    )
}

async fn sign_up(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(body): Json<SignUpRequest>,
) -> Result<(StatusCode, CookieJar, Json<SessionResponse>)> {
    let session = state
        .auth
        .sign_up(&body.email, &body.password, body.display_name.as_deref())
        .await?;
    let (jar, response) = start_session(&state, jar, session);
    Ok((StatusCode::CREATED, jar, response))
}

async fn sign_in(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(body): Json<SignInRequest>,
) -> Result<(CookieJar, Json<SessionResponse>)> {
    let session = state.auth.sign_in(&body.email, &body.password).await?;
    Ok(start_session(&state, jar, session))
}

async fn sign_in_with_provider(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(body): Json<ProviderSignInRequest>,
) -> Result<(CookieJar, Json<SessionResponse>)> {
    let provider: OAuthProvider = body.provider.parse().map_err(AppError::BadRequest)?;
    if body.credential.trim().is_empty() {
        return Err(AppError::BadRequest("credential is required".to_string()));
    }

    let session = state
        .auth
        .sign_in_with_provider(provider, body.credential.trim())
        .await?;
    Ok(start_session(&state, jar, session))
}

/// Clear the session cookie. Always succeeds, signed in or not.
async fn sign_out(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    headers: axum::http::HeaderMap,
) -> (StatusCode, CookieJar) {
    if let Some(user) = get_current_user(&state, &jar, &headers).await {
        tracing::info!(uid = %user.uid, "User signed out");
    }
    let jar = jar.add(cleared_session_cookie(&state.config));
    (StatusCode::NO_CONTENT, jar)
}

async fn password_reset(
    State(state): State<Arc<AppState>>,
    Json(body): Json<PasswordResetRequest>,
) -> Result<StatusCode> {
    state.auth.reset_password(&body.email).await?;
    Ok(StatusCode::NO_CONTENT)
}
