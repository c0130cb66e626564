// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request};
use axum::response::Response;
use dashmap::DashMap;
use inkwell_api::config::Config;
use inkwell_api::db::{FirestoreDb, MemoryDb};
use inkwell_api::error::AppError;
use inkwell_api::models::{AuthErrorCode, AuthSession, AuthUser, OAuthProvider};
use inkwell_api::routes::create_router;
use inkwell_api::services::{FirebaseTokenVerifier, IdentityProvider, ServiceAccount};
use inkwell_api::AppState;
use jsonwebtoken::{encode, Algorithm, DecodingKey, EncodingKey, Header};
use serde_json::{json, Map, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tower::ServiceExt;

pub const PRIVATE_PEM: &str = include_str!("../fixtures/test_rsa_private.pem");
pub const PUBLIC_PEM: &str = include_str!("../fixtures/test_rsa_public.pem");
pub const KEY_ID: &str = "test-kid";

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Connect to the Firestore emulator.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    let mut config = Config::test_default();
    config.firestore_emulator_host = std::env::var("FIRESTORE_EMULATOR_HOST").ok();
    FirestoreDb::new(&config)
        .await
        .expect("Failed to connect to Firestore emulator")
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

/// Sign an ID token for `uid` the way the identity service would.
#[allow(dead_code)]
pub fn mint_token(uid: &str, email: Option<&str>, claims: &Map<String, Value>) -> String {
    let project = Config::test_default().firebase_project_id;
    let now = now_secs();
    let mut payload = json!({
        "iss": format!("https://securetoken.google.com/{project}"),
        "aud": project,
        "sub": uid,
        "user_id": uid,
        "iat": now,
        "auth_time": now,
        "exp": now + 3600,
        "email_verified": false,
        "firebase": {"sign_in_provider": "password"},
    });
    if let Some(email) = email {
        payload["email"] = json!(email);
    }
    for (k, v) in claims {
        payload[k] = v.clone();
    }

    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(KEY_ID.to_string());
    encode(
        &header,
        &payload,
        &EncodingKey::from_rsa_pem(PRIVATE_PEM.as_bytes()).unwrap(),
    )
    .unwrap()
}

/// Token for a caller with the `admin` claim.
#[allow(dead_code)]
pub fn admin_token(uid: &str) -> String {
    let mut claims = Map::new();
    claims.insert("admin".to_string(), json!(true));
    mint_token(uid, Some("admin@example.com"), &claims)
}

struct FakeAccount {
    password: String,
    user: AuthUser,
}

/// Identity provider backed by a map, issuing tokens signed with the test key.
#[derive(Default)]
pub struct FakeIdentityProvider {
    accounts: DashMap<String, FakeAccount>,
    tokens: DashMap<String, String>,
    claims: DashMap<String, Map<String, Value>>,
    next_uid: AtomicU64,
}

impl FakeIdentityProvider {
    fn session_for(&self, user: AuthUser) -> AuthSession {
        let claims = self
            .claims
            .get(&user.uid)
            .map(|c| c.clone())
            .unwrap_or_default();
        let id_token = mint_token(&user.uid, user.email.as_deref(), &claims);
        self.tokens.insert(id_token.clone(), user.uid.clone());
        AuthSession {
            id_token,
            refresh_token: format!("refresh-{}", user.uid),
            expires_in: 3600,
            user,
        }
    }

    fn user_by_uid(&self, uid: &str) -> Option<AuthUser> {
        self.accounts
            .iter()
            .find(|a| a.user.uid == uid)
            .map(|a| a.user.clone())
    }

    fn user_for_token(&self, id_token: &str) -> Result<AuthUser, AppError> {
        self.tokens
            .get(id_token)
            .and_then(|uid| self.user_by_uid(&uid))
            .ok_or(AppError::Auth(AuthErrorCode::InvalidCredential))
    }

    fn new_uid(&self) -> String {
        format!("uid-{}", self.next_uid.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentityProvider {
    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthSession, AppError> {
        if !email.contains('@') {
            return Err(AppError::Auth(AuthErrorCode::InvalidEmail));
        }
        if password.len() < 6 {
            return Err(AppError::Auth(AuthErrorCode::WeakPassword));
        }
        if self.accounts.contains_key(email) {
            return Err(AppError::Auth(AuthErrorCode::EmailExists));
        }

        let user = AuthUser {
            uid: self.new_uid(),
            email: Some(email.to_string()),
            display_name: None,
            photo_url: None,
            email_verified: false,
            provider_id: Some("password".to_string()),
        };
        self.accounts.insert(
            email.to_string(),
            FakeAccount {
                password: password.to_string(),
                user: user.clone(),
            },
        );
        Ok(self.session_for(user))
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AppError> {
        let user = {
            let account = self
                .accounts
                .get(email)
                .ok_or(AppError::Auth(AuthErrorCode::UserNotFound))?;
            if account.password != password {
                return Err(AppError::Auth(AuthErrorCode::WrongPassword));
            }
            account.user.clone()
        };
        Ok(self.session_for(user))
    }

    async fn sign_in_with_idp(
        &self,
        provider: OAuthProvider,
        credential: &str,
    ) -> Result<AuthSession, AppError> {
        if credential == "bad-credential" {
            return Err(AppError::Auth(AuthErrorCode::InvalidCredential));
        }
        let email = format!("{credential}@{}", provider.provider_id());
        let existing = self.accounts.get(&email).map(|a| a.user.clone());
        let user = match existing {
            Some(user) => user,
            None => {
                let user = AuthUser {
                    uid: self.new_uid(),
                    email: Some(email.clone()),
                    display_name: Some(format!("{} user", provider.name())),
                    photo_url: Some("https://example.com/avatar.png".to_string()),
                    email_verified: true,
                    provider_id: Some(provider.provider_id().to_string()),
                };
                self.accounts.insert(
                    email,
                    FakeAccount {
                        password: String::new(),
                        user: user.clone(),
                    },
                );
                user
            }
        };
        Ok(self.session_for(user))
    }

    async fn update_profile(&self, id_token: &str, display_name: &str) -> Result<AuthUser, AppError> {
        let user = self.user_for_token(id_token)?;
        let email = user.email.clone().unwrap_or_default();
        let mut account = self
            .accounts
            .get_mut(&email)
            .ok_or(AppError::Auth(AuthErrorCode::UserNotFound))?;
        account.user.display_name = Some(display_name.to_string());
        Ok(account.user.clone())
    }

    async fn send_password_reset(&self, email: &str) -> Result<(), AppError> {
        if self.accounts.contains_key(email) {
            Ok(())
        } else {
            Err(AppError::Auth(AuthErrorCode::UserNotFound))
        }
    }

    async fn lookup(&self, id_token: &str) -> Result<AuthUser, AppError> {
        self.user_for_token(id_token)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<AuthUser>, AppError> {
        Ok(self.accounts.get(email).map(|a| a.user.clone()))
    }

    async fn set_custom_claims(&self, uid: &str, claims: &Map<String, Value>) -> Result<(), AppError> {
        if self.user_by_uid(uid).is_none() {
            return Err(AppError::NotFound(format!("user {uid}")));
        }
        self.claims.insert(uid.to_string(), claims.clone());
        Ok(())
    }

    async fn delete_user(&self, uid: &str) -> Result<(), AppError> {
        let email = self
            .user_by_uid(uid)
            .and_then(|u| u.email)
            .ok_or_else(|| AppError::NotFound(format!("user {uid}")))?;
        self.accounts.remove(&email);
        Ok(())
    }
}

/// Config used by integration tests. Carries the test key as the service
/// account key so custom tokens can be signed.
pub fn test_config() -> Config {
    let mut config = Config::test_default();
    config.firebase_private_key = PRIVATE_PEM.to_string();
    config
}

/// Create a test app with in-memory storage and a fake identity provider.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    create_test_app_with_config(test_config())
}

#[allow(dead_code)]
pub fn create_test_app_with_config(config: Config) -> (axum::Router, Arc<AppState>) {
    let db = Arc::new(MemoryDb::new());
    let identity = Arc::new(FakeIdentityProvider::default());
    let service_account = Arc::new(ServiceAccount::from_config(&config, reqwest::Client::new()));
    let verifier = FirebaseTokenVerifier::new_with_static_key(
        &config,
        KEY_ID,
        DecodingKey::from_rsa_pem(PUBLIC_PEM.as_bytes()).unwrap(),
    )
    .unwrap();

    let state = Arc::new(
        AppState::new(config, db, identity, service_account, verifier).unwrap(),
    );
    (create_router(state.clone()), state)
}

/// Build a request with an optional bearer token and JSON body.
#[allow(dead_code)]
pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

#[allow(dead_code)]
pub async fn send(app: &axum::Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

#[allow(dead_code)]
pub async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Sign up through the API and return `(uid, id_token)`.
#[allow(dead_code)]
pub async fn sign_up(app: &axum::Router, email: &str, display_name: Option<&str>) -> (String, String) {
    let mut body = json!({"email": email, "password": "correct-horse"});
    if let Some(name) = display_name {
        body["displayName"] = json!(name);
    }
    let response = send(app, json_request("POST", "/auth/sign-up", None, Some(body))).await;
    assert_eq!(response.status(), axum::http::StatusCode::CREATED);
    let json = body_json(response).await;
    (
        json["user"]["uid"].as_str().unwrap().to_string(),
        json["idToken"].as_str().unwrap().to_string(),
    )
}
