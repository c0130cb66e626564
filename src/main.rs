// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Inkwell API Server
//!
//! Blog API with Firebase Auth sessions, Firestore storage and background
//! jobs driven by the workflow service.

use inkwell_api::{
    config::{Config, DatastoreBackend},
    db::{Datastore, FirestoreDb, MemoryDb},
    services::{FirebaseTokenVerifier, IdentityToolkitClient, ServiceAccount},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    let config = Config::from_env()?;
    tracing::info!(
        port = config.port,
        env = ?config.app_env,
        "Starting Inkwell API"
    );

    let db: Arc<dyn Datastore> = match config.datastore_backend {
        DatastoreBackend::Firestore => Arc::new(FirestoreDb::new(&config).await?),
        DatastoreBackend::Memory => {
            tracing::warn!("Using in-memory datastore; data is lost on restart");
            Arc::new(MemoryDb::new())
        }
    };

    let http_client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(15))
        .build()?;
    let service_account = Arc::new(ServiceAccount::from_config(&config, http_client));
    let identity = Arc::new(IdentityToolkitClient::new(&config, service_account.clone())?);
    if let Some(host) = &config.auth_emulator_host {
        tracing::warn!(host = %host, "Using Auth emulator; ID token signatures are not checked");
    }

    let token_verifier = FirebaseTokenVerifier::new(&config)?;

    let state = Arc::new(AppState::new(
        config.clone(),
        db,
        identity,
        service_account,
        token_verifier,
    )?);
    tracing::info!(
        functions = state.jobs.len(),
        events_enabled = state.workflow.is_enabled(),
        "Workflow functions loaded"
    );

    let app = inkwell_api::routes::create_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("inkwell_api=debug,info"));

    tracing_subscriber::registry().with(filter).with(format).init();
}
