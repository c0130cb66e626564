// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! ID token authentication middleware and session cookie helpers.

use crate::config::Config;
use crate::error::AppError;
use crate::services::{DecodedIdToken, TokenError};
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use std::sync::Arc;

/// Cookie holding the caller's ID token.
pub const SESSION_COOKIE: &str = "firebaseIdToken";

/// Authenticated caller, inserted into request extensions by [`require_auth`].
pub type CurrentUser = DecodedIdToken;

/// Token from the session cookie, falling back to an `Authorization: Bearer` header.
pub fn session_token(jar: &CookieJar, headers: &HeaderMap) -> Option<String> {
    if let Some(cookie) = jar.get(SESSION_COOKIE).filter(|c| !c.value().is_empty()) {
        return Some(cookie.value().to_string());
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

/// Verify the caller's token. Missing or invalid tokens yield `None`.
pub async fn get_current_user(
    state: &AppState,
    jar: &CookieJar,
    headers: &HeaderMap,
) -> Option<CurrentUser> {
    let token = session_token(jar, headers)?;

    match state.token_verifier.verify_id_token(&token).await {
        Ok(user) => Some(user),
        Err(TokenError::Invalid(reason)) => {
            tracing::debug!(reason = %reason, "Rejected ID token");
            None
        }
        Err(TokenError::Transient(reason)) => {
            tracing::error!(reason = %reason, "ID token verification unavailable");
            None
        }
    }
}

/// Middleware that requires a valid ID token.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = get_current_user(&state, &jar, request.headers())
        .await
        .ok_or(AppError::Unauthorized)?;

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// Middleware that requires the `admin` custom claim. Must run inside
/// [`require_auth`].
pub async fn require_admin(request: Request, next: Next) -> Result<Response, AppError> {
    let user = request
        .extensions()
        .get::<CurrentUser>()
        .ok_or(AppError::Unauthorized)?;

    if !user.is_admin() {
        tracing::warn!(uid = %user.uid, "Non-admin caller on admin route");
        return Err(AppError::Forbidden("admin privileges required".to_string()));
    }

    Ok(next.run(request).await)
}

/// Cookies are `Secure` unless the app is served from localhost.
fn is_secure(config: &Config) -> bool {
    !(config.app_url.starts_with("http://localhost")
        || config.app_url.starts_with("http://127.0.0.1"))
}

/// Session cookie carrying `token`, expiring with it.
pub fn session_cookie(config: &Config, token: String, max_age_secs: u64) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(is_secure(config))
        .max_age(time::Duration::seconds(
            i64::try_from(max_age_secs).unwrap_or(i64::MAX),
        ))
        .build()
}

/// Cookie that clears the session, with the same attributes it was set with.
pub fn cleared_session_cookie(config: &Config) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(is_secure(config))
        .max_age(time::Duration::ZERO)
        .build()
}
