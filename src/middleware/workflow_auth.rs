// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Signature check for requests from the workflow service.

use crate::error::AppError;
use crate::services::workflow::{verify_signature, HEADER_SIGNATURE};
use crate::AppState;
use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::Method,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// Largest execution request accepted (event plus memoized step data).
const MAX_BODY_BYTES: usize = 4 * 1024 * 1024;

/// Require a valid `X-Inngest-Signature` on execution requests.
///
/// Skipped for GET (introspection) and in dev-server mode. A PUT sync may
/// arrive unsigned since registration authenticates itself outbound; a
/// signed one is still verified.
pub async fn require_workflow_signature(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let workflow = &state.config.workflow;
    let unsigned_sync =
        request.method() == Method::PUT && !request.headers().contains_key(HEADER_SIGNATURE);
    if workflow.dev || request.method() == Method::GET || unsigned_sync {
        return Ok(next.run(request).await);
    }

    let Some(signing_key) = workflow.signing_key.as_deref() else {
        tracing::error!("Workflow request received but no signing key is configured");
        return Err(AppError::Unauthorized);
    };

    let (parts, body) = request.into_parts();
    let bytes = to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|e| AppError::BadRequest(format!("unreadable body: {e}")))?;

    let header = parts
        .headers
        .get(HEADER_SIGNATURE)
        .and_then(|h| h.to_str().ok());

    if let Err(reason) = verify_signature(
        header,
        &bytes,
        signing_key,
        chrono::Utc::now().timestamp(),
    ) {
        tracing::warn!(reason = %reason, method = %parts.method, "Blocked workflow request");
        return Err(AppError::Unauthorized);
    }

    Ok(next.run(Request::from_parts(parts, Body::from(bytes))).await)
}
