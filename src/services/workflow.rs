// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Workflow service client (Inngest HTTP protocol).
//!
//! Handles:
//! - Publishing typed events to the event API
//! - Syncing function definitions with the service
//! - Signing and verifying request signatures

use crate::config::{WorkflowConfig, WORKFLOW_APP_ID};
use crate::error::AppError;
use crate::models::events::{Event, EventEnvelope};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::time::Duration;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// SDK identifier sent in `X-Inngest-Sdk`.
pub const SDK_NAME: &str = concat!("inkwell-rs:v", env!("CARGO_PKG_VERSION"));
/// Execution protocol version sent in `X-Inngest-Req-Version`.
pub const REQUEST_VERSION: &str = "1";
pub const HEADER_SDK: &str = "x-inngest-sdk";
pub const HEADER_REQ_VERSION: &str = "x-inngest-req-version";
pub const HEADER_SIGNATURE: &str = "x-inngest-signature";
/// Signed requests older than this are rejected.
pub const MAX_SIGNATURE_AGE_SECS: i64 = 5 * 60;

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

// ─── Function definitions ────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trigger {
    pub event: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRuntime {
    #[serde(rename = "type")]
    pub kind: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepConfig {
    pub id: String,
    pub name: String,
    pub runtime: StepRuntime,
}

/// A function as described to the service during sync.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionConfig {
    pub id: String,
    pub name: String,
    pub triggers: Vec<Trigger>,
    pub steps: BTreeMap<String, StepConfig>,
}

/// Fully-qualified function id, as used in `fnId`.
pub fn function_id(slug: &str) -> String {
    format!("{WORKFLOW_APP_ID}-{slug}")
}

impl FunctionConfig {
    /// Describe a single-entrypoint function served at `serve_url`.
    pub fn new(slug: &str, name: &str, events: &[&str], serve_url: &str) -> Self {
        let id = function_id(slug);
        let url = format!(
            "{}?fnId={}&stepId=step",
            serve_url,
            urlencoding::encode(&id)
        );
        let mut steps = BTreeMap::new();
        steps.insert(
            "step".to_string(),
            StepConfig {
                id: "step".to_string(),
                name: "step".to_string(),
                runtime: StepRuntime {
                    kind: "http".to_string(),
                    url,
                },
            },
        );
        Self {
            id,
            name: name.to_string(),
            triggers: events
                .iter()
                .map(|e| Trigger {
                    event: e.to_string(),
                })
                .collect(),
            steps,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SyncRequest<'a> {
    url: &'a str,
    v: &'static str,
    deploy_type: &'static str,
    sdk: &'static str,
    framework: &'static str,
    app_name: &'static str,
    functions: &'a [FunctionConfig],
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    #[serde(default)]
    ids: Vec<String>,
}

// ─── Signing ─────────────────────────────────────────────────

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("missing signature header")]
    Missing,
    #[error("malformed signature header")]
    Malformed,
    #[error("signature expired")]
    Expired,
    #[error("signature mismatch")]
    Mismatch,
}

/// Split `signkey-<env>-<secret>` into its prefix and secret.
fn split_signing_key(key: &str) -> (&str, &str) {
    if let Some(rest) = key.strip_prefix("signkey-") {
        if let Some(dash) = rest.find('-') {
            let split = "signkey-".len() + dash + 1;
            return key.split_at(split);
        }
    }
    ("", key)
}

/// Key sent as a bearer token when talking to the service API: the prefix
/// followed by the SHA-256 of the hex-decoded secret.
pub fn hashed_signing_key(key: &str) -> String {
    let (prefix, secret) = split_signing_key(key);
    let bytes = hex::decode(secret).unwrap_or_else(|_| secret.as_bytes().to_vec());
    format!("{prefix}{}", hex::encode(Sha256::digest(&bytes)))
}

/// HMAC-SHA256 of `body ‖ ts`, keyed with the signing secret.
pub fn sign_payload(body: &[u8], key: &str, timestamp: i64) -> String {
    let (_, secret) = split_signing_key(key);
    // HMAC accepts keys of any length, so this cannot fail.
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(body);
    mac.update(timestamp.to_string().as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Value for the signature header.
pub fn signature_header(body: &[u8], key: &str, timestamp: i64) -> String {
    format!("t={timestamp}&s={}", sign_payload(body, key, timestamp))
}

/// Check a `t=<unix>&s=<hex>` signature header against the body.
pub fn verify_signature(
    header: Option<&str>,
    body: &[u8],
    key: &str,
    now: i64,
) -> Result<(), SignatureError> {
    let header = header.ok_or(SignatureError::Missing)?;

    let mut timestamp = None;
    let mut signature = None;
    for part in header.split('&') {
        match part.split_once('=') {
            Some(("t", v)) => timestamp = v.parse::<i64>().ok(),
            Some(("s", v)) => signature = Some(v),
            _ => {}
        }
    }
    let (Some(timestamp), Some(signature)) = (timestamp, signature) else {
        return Err(SignatureError::Malformed);
    };

    if (now - timestamp).abs() > MAX_SIGNATURE_AGE_SECS {
        return Err(SignatureError::Expired);
    }

    let expected = sign_payload(body, key, timestamp);
    if bool::from(expected.as_bytes().ct_eq(signature.as_bytes())) {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

// ─── Client ──────────────────────────────────────────────────

/// Client for the workflow service's event and sync APIs.
#[derive(Clone)]
pub struct WorkflowClient {
    http: reqwest::Client,
    config: WorkflowConfig,
}

impl WorkflowClient {
    pub fn new(config: &WorkflowConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;
        Ok(Self {
            http,
            config: config.clone(),
        })
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    /// Publishing needs an event key.
    pub fn is_enabled(&self) -> bool {
        self.config.event_key.is_some()
    }

    /// Validate and send an event. Returns the ids the service assigned.
    pub async fn send(&self, event: &Event) -> Result<Vec<String>, AppError> {
        event
            .validate()
            .map_err(|e| AppError::BadRequest(format!("invalid {} event: {e}", event.name())))?;

        let Some(event_key) = &self.config.event_key else {
            tracing::debug!(event = event.name(), "Event publishing disabled, dropping event");
            return Ok(Vec::new());
        };

        let envelope = EventEnvelope::from_event(event, Some(chrono::Utc::now().timestamp_millis()));
        let url = format!(
            "{}/e/{}",
            self.config.event_api_base_url.trim_end_matches('/'),
            event_key
        );

        let response = self
            .http
            .post(&url)
            .header(HEADER_SDK, SDK_NAME)
            .json(&[envelope])
            .send()
            .await
            .map_err(|e| AppError::Workflow(format!("event send failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Workflow(format!(
                "event API returned {status}: {body}"
            )));
        }

        let sent: SendResponse = response
            .json()
            .await
            .map_err(|e| AppError::Workflow(format!("invalid event API response: {e}")))?;

        tracing::debug!(event = event.name(), ids = ?sent.ids, "Event published");
        Ok(sent.ids)
    }

    /// Send an event from a data operation. Failures are logged, not returned.
    pub async fn publish(&self, event: Event) {
        if let Err(e) = self.send(&event).await {
            tracing::warn!(event = event.name(), error = %e, "Failed to publish event");
        }
    }

    /// Register function definitions with the service.
    pub async fn register(
        &self,
        serve_url: &str,
        functions: &[FunctionConfig],
    ) -> Result<(), AppError> {
        let url = format!(
            "{}/fn/register",
            self.config.api_base_url.trim_end_matches('/')
        );
        let body = SyncRequest {
            url: serve_url,
            v: "0.1",
            deploy_type: "ping",
            sdk: SDK_NAME,
            framework: "axum",
            app_name: WORKFLOW_APP_ID,
            functions,
        };

        let mut request = self.http.post(&url).header(HEADER_SDK, SDK_NAME).json(&body);
        if let Some(key) = &self.config.signing_key {
            request = request.bearer_auth(hashed_signing_key(key));
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::Workflow(format!("sync request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Workflow(format!(
                "sync rejected with {status}: {body}"
            )));
        }

        tracing::info!(
            url = serve_url,
            functions = functions.len(),
            "Synced functions with workflow service"
        );
        Ok(())
    }
}
