// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Serve endpoint for the workflow service.
//!
//! - `GET` reports what this app serves.
//! - `PUT` registers the functions with the service.
//! - `POST ?fnId=..&stepId=..` runs one slice of a function.
//!
//! Signatures are checked by [`crate::middleware::require_workflow_signature`].

use axum::{
    extract::{Query, State},
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::jobs::{ExecutionRequest, Outcome};
use crate::services::workflow::{HEADER_REQ_VERSION, HEADER_SDK, REQUEST_VERSION, SDK_NAME};
use crate::AppState;

/// Path the workflow service calls back on.
pub const SERVE_PATH: &str = "/api/inngest";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route(SERVE_PATH, get(introspect).put(sync).post(execute))
}

/// Public URL the workflow service should call.
pub fn serve_url(app_url: &str) -> String {
    format!("{}{}", app_url.trim_end_matches('/'), SERVE_PATH)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct Introspection {
    pub function_count: usize,
    pub has_event_key: bool,
    pub has_signing_key: bool,
    pub mode: &'static str,
}

async fn introspect(State(state): State<Arc<AppState>>) -> Json<Introspection> {
    let workflow = state.workflow.config();
    Json(Introspection {
        function_count: state.jobs.len(),
        has_event_key: workflow.event_key.is_some(),
        has_signing_key: workflow.signing_key.is_some(),
        mode: if workflow.dev { "dev" } else { "cloud" },
    })
}

#[derive(Debug, Serialize)]
pub struct SyncResponse {
    message: &'static str,
    functions: usize,
}

async fn sync(State(state): State<Arc<AppState>>) -> Result<Json<SyncResponse>> {
    let url = serve_url(&state.config.app_url);
    let configs = state.jobs.configs(&url);
    state.workflow.register(&url, &configs).await?;
    Ok(Json(SyncResponse {
        message: "Successfully synced",
        functions: configs.len(),
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteParams {
    fn_id: String,
    #[serde(default)]
    step_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct FailureBody {
    name: String,
    message: String,
}

async fn execute(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ExecuteParams>,
    Json(request): Json<ExecutionRequest>,
) -> Result<Response> {
    let function = state
        .jobs
        .find(&params.fn_id)
        .ok_or_else(|| AppError::NotFound(format!("function {}", params.fn_id)))?;

    tracing::debug!(
        function = %params.fn_id,
        step = params.step_id.as_deref().unwrap_or("step"),
        event = %request.event.name,
        "Executing function"
    );

    let outcome = state
        .jobs
        .execute(function.as_ref(), request, &state.job_deps)
        .await;

    let mut response = match outcome {
        Outcome::Complete(output) => (StatusCode::OK, Json(output)).into_response(),
        Outcome::Step(op) => (StatusCode::PARTIAL_CONTENT, Json(vec![op])).into_response(),
        Outcome::Failed { name, message } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(FailureBody { name, message }),
        )
            .into_response(),
    };

    let headers = response.headers_mut();
    headers.insert(
        HeaderName::from_static(HEADER_SDK),
        HeaderValue::from_static(SDK_NAME),
    );
    headers.insert(
        HeaderName::from_static(HEADER_REQ_VERSION),
        HeaderValue::from_static(REQUEST_VERSION),
    );
    Ok(response)
}
