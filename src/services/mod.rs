// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod admin;
pub mod auth;
pub mod identity;
pub mod posts;
pub mod service_account;
pub mod token_verifier;
pub mod users;
pub mod workflow;

pub use admin::AdminService;
pub use auth::AuthService;
pub use identity::{IdentityProvider, IdentityToolkitClient};
pub use posts::PostService;
pub use service_account::ServiceAccount;
pub use token_verifier::{DecodedIdToken, FirebaseTokenVerifier, TokenError};
pub use users::UserService;
pub use workflow::WorkflowClient;
