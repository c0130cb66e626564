// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Inkwell: a blog API backed by Firebase Auth and Firestore.
//!
//! Users sign in with email/password or an OAuth provider, manage a profile
//! and publish posts. Data changes are announced to a workflow service, which
//! calls back into this crate to run background jobs.

pub mod config;
pub mod db;
pub mod error;
pub mod jobs;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::Datastore;
use jobs::{JobDeps, JobRegistry};
use services::{
    AdminService, AuthService, FirebaseTokenVerifier, IdentityProvider, PostService,
    ServiceAccount, UserService, WorkflowClient,
};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub token_verifier: FirebaseTokenVerifier,
    pub workflow: WorkflowClient,
    pub users: Arc<UserService>,
    pub posts: PostService,
    pub auth: AuthService,
    pub admin: AdminService,
    pub jobs: JobRegistry,
    pub job_deps: JobDeps,
}

impl AppState {
    /// Wire services on top of the given datastore and identity provider.
    pub fn new(
        config: Config,
        db: Arc<dyn Datastore>,
        identity: Arc<dyn IdentityProvider>,
        service_account: Arc<ServiceAccount>,
        token_verifier: FirebaseTokenVerifier,
    ) -> anyhow::Result<Self> {
        let workflow = WorkflowClient::new(&config.workflow)?;
        let users = Arc::new(UserService::new(db.clone(), workflow.clone()));
        let posts = PostService::new(db.clone(), workflow.clone());
        let auth = AuthService::new(identity.clone(), users.clone());
        let admin = AdminService::new(identity, service_account);

        Ok(Self {
            config,
            token_verifier,
            workflow,
            users: users.clone(),
            posts,
            auth,
            admin,
            jobs: JobRegistry::standard(),
            job_deps: JobDeps { users },
        })
    }
}
