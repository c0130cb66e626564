// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Values are validated once at startup. Empty strings count as unset, and
//! `SKIP_ENV_VALIDATION` turns missing required values into empty strings so
//! container builds can run without credentials.

use std::env;
use std::str::FromStr;
use validator::ValidateEmail;

/// Application id reported to the workflow service.
pub const WORKFLOW_APP_ID: &str = "inkwell";

const DEFAULT_WORKFLOW_API_URL: &str = "https://api.inngest.com";
const DEFAULT_WORKFLOW_EVENT_URL: &str = "https://inn.gs";
const DEV_SERVER_URL: &str = "http://localhost:8288";

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppEnv {
    #[default]
    Development,
    Test,
    Production,
}

impl FromStr for AppEnv {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "development" => Ok(AppEnv::Development),
            "test" => Ok(AppEnv::Test),
            "production" => Ok(AppEnv::Production),
            other => Err(ConfigError::Invalid {
                name: "APP_ENV",
                reason: format!("expected development, test or production, got {other:?}"),
            }),
        }
    }
}

/// Which document store backs the data-access layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DatastoreBackend {
    #[default]
    Firestore,
    Memory,
}

/// Public Firebase web configuration. Safe to hand to browsers.
#[derive(Debug, Clone, Default, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    pub api_key: String,
    pub auth_domain: String,
    pub project_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_bucket: Option<String>,
    pub messaging_sender_id: String,
    pub app_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub measurement_id: Option<String>,
}

/// Workflow service settings.
#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    pub event_key: Option<String>,
    pub signing_key: Option<String>,
    /// Local dev server: no signature checks, local URLs.
    pub dev: bool,
    pub api_base_url: String,
    pub event_api_base_url: String,
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub app_env: AppEnv,
    /// Server port
    pub port: u16,
    /// Public base URL of this service (used for workflow sync)
    pub app_url: String,
    /// Frontend URL for CORS
    pub frontend_url: String,

    // --- Service account (secret) ---
    pub firebase_project_id: String,
    pub firebase_client_email: String,
    /// PEM-encoded private key with real newlines
    pub firebase_private_key: String,

    pub client: ClientConfig,
    pub auth_emulator_host: Option<String>,
    /// `host:port` of a local Firestore emulator
    pub firestore_emulator_host: Option<String>,
    pub datastore_backend: DatastoreBackend,
    pub workflow: WorkflowConfig,
}

impl Config {
    /// Config for tests. Never talks to real services.
    pub fn test_default() -> Self {
        Self {
            app_env: AppEnv::Test,
            port: 8080,
            app_url: "http://localhost:8080".to_string(),
            frontend_url: "http://localhost:3000".to_string(),
            firebase_project_id: "test-project".to_string(),
            firebase_client_email: "firebase-adminsdk@test-project.iam.gserviceaccount.com"
                .to_string(),
            firebase_private_key: String::new(),
            client: ClientConfig {
                api_key: "test-api-key".to_string(),
                auth_domain: "test-project.firebaseapp.com".to_string(),
                project_id: "test-project".to_string(),
                storage_bucket: None,
                messaging_sender_id: "1234567890".to_string(),
                app_id: "1:1234567890:web:abcdef".to_string(),
                measurement_id: None,
            },
            auth_emulator_host: None,
            firestore_emulator_host: None,
            datastore_backend: DatastoreBackend::Memory,
            workflow: WorkflowConfig {
                event_key: None,
                signing_key: Some("signkey-test-0123456789abcdef".to_string()),
                dev: false,
                api_base_url: DEFAULT_WORKFLOW_API_URL.to_string(),
                event_api_base_url: DEFAULT_WORKFLOW_EVENT_URL.to_string(),
            },
        }
    }

    /// Load configuration from environment variables (and `.env` if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let skip_validation =
            lookup("SKIP_ENV_VALIDATION").is_some_and(|v| !v.trim().is_empty());
        let vars = Vars {
            lookup,
            skip_validation,
        };

        let app_env = match vars.optional("APP_ENV") {
            Some(raw) => raw.parse()?,
            None => AppEnv::default(),
        };

        let firebase_project_id = vars.required("FIREBASE_PROJECT_ID")?;
        let firebase_client_email = vars.required("FIREBASE_CLIENT_EMAIL")?;
        if !vars.skip_validation && !firebase_client_email.validate_email() {
            return Err(ConfigError::Invalid {
                name: "FIREBASE_CLIENT_EMAIL",
                reason: "must be an email address".to_string(),
            });
        }
        let firebase_private_key = vars
            .required("FIREBASE_PRIVATE_KEY")?
            .replace("\\n", "\n");

        let client = ClientConfig {
            api_key: vars.required("FIREBASE_API_KEY")?,
            auth_domain: vars.required("FIREBASE_AUTH_DOMAIN")?,
            project_id: firebase_project_id.clone(),
            storage_bucket: vars.optional("FIREBASE_STORAGE_BUCKET"),
            messaging_sender_id: vars.required("FIREBASE_MESSAGING_SENDER_ID")?,
            app_id: vars.required("FIREBASE_APP_ID")?,
            measurement_id: vars.optional("FIREBASE_MEASUREMENT_ID"),
        };

        let datastore_backend = match vars.optional("DATASTORE_BACKEND").as_deref() {
            None | Some("firestore") => DatastoreBackend::Firestore,
            Some("memory") => DatastoreBackend::Memory,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "DATASTORE_BACKEND",
                    reason: format!("expected firestore or memory, got {other:?}"),
                })
            }
        };

        let dev = vars
            .optional("INNGEST_DEV")
            .is_some_and(|v| v != "0" && v != "false");
        let default_api = if dev { DEV_SERVER_URL } else { DEFAULT_WORKFLOW_API_URL };
        let default_events = if dev { DEV_SERVER_URL } else { DEFAULT_WORKFLOW_EVENT_URL };
        let workflow = WorkflowConfig {
            event_key: vars.optional("INNGEST_EVENT_KEY"),
            signing_key: vars.optional("INNGEST_SIGNING_KEY"),
            dev,
            api_base_url: vars
                .optional("INNGEST_BASE_URL")
                .unwrap_or_else(|| default_api.to_string()),
            event_api_base_url: vars
                .optional("INNGEST_EVENT_API_BASE_URL")
                .or_else(|| vars.optional("INNGEST_BASE_URL"))
                .unwrap_or_else(|| default_events.to_string()),
        };

        if app_env == AppEnv::Production
            && !workflow.dev
            && workflow.signing_key.is_none()
            && !vars.skip_validation
        {
            return Err(ConfigError::Missing("INNGEST_SIGNING_KEY"));
        }

        let port = match vars.optional("PORT") {
            Some(raw) => raw.parse().map_err(|e| ConfigError::Invalid {
                name: "PORT",
                reason: format!("{raw:?}: {e}"),
            })?,
            None => 8080,
        };

        Ok(Self {
            app_env,
            port,
            app_url: vars
                .optional("APP_URL")
                .unwrap_or_else(|| "http://localhost:8080".to_string()),
            frontend_url: vars
                .optional("FRONTEND_URL")
                .unwrap_or_else(|| "http://localhost:3000".to_string()),
            firebase_project_id,
            firebase_client_email,
            firebase_private_key,
            client,
            auth_emulator_host: vars.optional("FIREBASE_AUTH_EMULATOR_HOST"),
            firestore_emulator_host: vars.optional("FIRESTORE_EMULATOR_HOST"),
            datastore_backend,
            workflow,
        })
    }

    pub fn is_production(&self) -> bool {
        self.app_env == AppEnv::Production
    }
}

struct Vars<F> {
    lookup: F,
    skip_validation: bool,
}

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, name: &str) -> Option<String> {
        (self.lookup)(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn required(&self, name: &'static str) -> Result<String, ConfigError> {
        match self.optional(name) {
            Some(value) => Ok(value),
            None if self.skip_validation => Ok(String::new()),
            None => Err(ConfigError::Missing(name)),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid environment variable {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}
