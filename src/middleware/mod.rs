// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Middleware modules (authentication, security, workflow signatures).

pub mod auth;
pub mod security;
pub mod workflow_auth;

pub use auth::{require_admin, require_auth, CurrentUser};
pub use workflow_auth::require_workflow_signature;
