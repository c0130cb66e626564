//! Example jobs: greeting, new-user welcome flow and post activity logging.

use crate::jobs::{JobContext, JobError, JobFunction};
use crate::models::events::{self, HelloWorldData, UserCreatedData};
use crate::time_utils::format_utc_rfc3339;
use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

fn event_data<T: serde::de::DeserializeOwned>(ctx: &JobContext<'_>) -> Result<T, JobError> {
    serde_json::from_value(ctx.event.data.clone())
        .with_context(|| format!("invalid {} payload", ctx.event.name))
        .map_err(JobError::Failed)
}

pub struct HelloWorld;

#[async_trait]
impl JobFunction for HelloWorld {
    fn slug(&self) -> &'static str {
        "hello-world"
    }

    fn name(&self) -> &'static str {
        "Hello World"
    }

    fn triggers(&self) -> &'static [&'static str] {
        &[events::HELLO_WORLD]
    }

    async fn run(&self, ctx: JobContext<'_>) -> Result<Value, JobError> {
        let data: HelloWorldData = event_data(&ctx)?;
        ctx.step.sleep("wait-a-moment", Duration::from_secs(1))?;
        Ok(json!({ "message": format!("Hello {}!", data.email) }))
    }
}

/// Result of a simulated delivery step.
#[derive(Debug, Serialize, Deserialize)]
struct Delivery {
    sent: bool,
    timestamp: String,
}

impl Delivery {
    fn now() -> Self {
        Self {
            sent: true,
            timestamp: format_utc_rfc3339(chrono::Utc::now()),
        }
    }
}

pub struct WelcomeNewUser;

#[async_trait]
impl JobFunction for WelcomeNewUser {
    fn slug(&self) -> &'static str {
        "welcome-new-user"
    }

    fn name(&self) -> &'static str {
        "Welcome New User"
    }

    fn triggers(&self) -> &'static [&'static str] {
        &[events::USER_CREATED]
    }

    async fn run(&self, ctx: JobContext<'_>) -> Result<Value, JobError> {
        let data: UserCreatedData = event_data(&ctx)?;
        tracing::info!(
            uid = %data.uid,
            sign_up_method = %data.sign_up_method,
            "Processing new user welcome"
        );

        // Re-read on every invocation so later steps see current data.
        let profile = ctx
            .deps
            .users
            .get_user_profile(&data.uid)
            .await
            .map_err(|e| {
                tracing::error!(uid = %data.uid, error = %e, "Failed to fetch user profile");
                JobError::Failed(anyhow::anyhow!("fetch user profile: {e}"))
            })?;

        let profile = &profile;
        let welcome: Delivery = ctx
            .step
            .run("send-welcome-email", move || async move {
                // Delivery is simulated.
                tracing::info!(
                    email = %profile.email,
                    display_name = %profile.display_name,
                    "Sending welcome email"
                );
                Ok(Delivery::now())
            })
            .await?;

        ctx.step
            .sleep("wait-before-tips", Duration::from_secs(60 * 60))?;

        let tips: Delivery = ctx
            .step
            .run("send-onboarding-tips", move || async move {
                tracing::info!(email = %profile.email, "Sending onboarding tips");
                Ok(Delivery::now())
            })
            .await?;

        Ok(json!({
            "uid": data.uid,
            "welcomeEmailSent": welcome.sent,
            "onboardingTipsSent": tips.sent,
        }))
    }
}

/// Fields shared by all post events. `title` only accompanies `post/created`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PostActivity {
    post_id: String,
    #[serde(default)]
    author_id: String,
    #[serde(default)]
    title: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Logged {
    logged: bool,
}

pub struct NotifyPostActivity;

#[async_trait]
impl JobFunction for NotifyPostActivity {
    fn slug(&self) -> &'static str {
        "notify-post-activity"
    }

    fn name(&self) -> &'static str {
        "Notify Post Activity"
    }

    fn triggers(&self) -> &'static [&'static str] {
        &[events::POST_CREATED, events::POST_UPDATED, events::POST_DELETED]
    }

    async fn run(&self, ctx: JobContext<'_>) -> Result<Value, JobError> {
        let action = ctx.event.action().to_string();
        let data: PostActivity = event_data(&ctx)?;

        let (action_ref, activity) = (action.as_str(), &data);
        let result: Logged = ctx
            .step
            .run("log-post-activity", move || async move {
                tracing::info!(
                    action = %action_ref,
                    post_id = %activity.post_id,
                    author_id = %activity.author_id,
                    title = ?activity.title,
                    "Post activity"
                );
                Ok(Logged { logged: true })
            })
            .await?;

        Ok(json!({
            "action": action,
            "postId": data.post_id,
            "logged": result.logged,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db::{Datastore, MemoryDb};
    use crate::jobs::step::hash_step_id;
    use crate::jobs::{ExecutionRequest, JobDeps, JobRegistry, OpCode, Outcome};
    use crate::models::{UserMetadata, UserProfile};
    use crate::services::{UserService, WorkflowClient};
    use std::collections::HashMap;
    use std::sync::Arc;

    async fn deps() -> JobDeps {
        let config = Config::test_default();
        let db = Arc::new(MemoryDb::new());
        let now = chrono::Utc::now();
        db.create_user(&UserProfile {
            uid: "u1".to_string(),
            email: "u1@example.com".to_string(),
            display_name: "U One".to_string(),
            photo_url: String::new(),
            email_verified: true,
            bio: String::new(),
            created_at: now,
            updated_at: now,
            metadata: UserMetadata {
                last_login_at: now,
                sign_up_method: "email".to_string(),
            },
        })
        .await
        .unwrap();
        JobDeps {
            users: Arc::new(UserService::new(
                db,
                WorkflowClient::new(&config.workflow).unwrap(),
            )),
        }
    }

    fn request(name: &str, data: Value, steps: HashMap<String, Value>) -> ExecutionRequest {
        serde_json::from_value(json!({
            "event": {"name": name, "data": data},
            "steps": steps,
            "ctx": {"run_id": "run-1", "attempt": 0},
        }))
        .unwrap()
    }

    async fn run(fn_id: &str, req: ExecutionRequest) -> Outcome {
        let registry = JobRegistry::standard();
        let deps = deps().await;
        let function = registry.find(fn_id).unwrap().clone();
        registry.execute(function.as_ref(), req, &deps).await
    }

    #[tokio::test]
    async fn hello_world_sleeps_then_greets() {
        let data = json!({"email": "a@example.com"});

        let first = run("inkwell-hello-world", request("test/hello.world", data.clone(), HashMap::new())).await;
        let Outcome::Step(op) = first else {
            panic!("expected sleep op");
        };
        assert_eq!(op.op, OpCode::Sleep);
        assert_eq!(op.name, "1s");

        let mut steps = HashMap::new();
        steps.insert(hash_step_id("wait-a-moment"), Value::Null);
        let done = run("inkwell-hello-world", request("test/hello.world", data, steps)).await;
        let Outcome::Complete(output) = done else {
            panic!("expected completion");
        };
        assert_eq!(output["message"], "Hello a@example.com!");
    }

    #[tokio::test]
    async fn welcome_flow_replays_to_completion() {
        let data = json!({"uid": "u1", "email": "u1@example.com", "signUpMethod": "email"});
        let mut steps = HashMap::new();
        steps.insert(
            hash_step_id("send-welcome-email"),
            json!({"data": {"sent": true, "timestamp": "2026-01-01T00:00:00.000Z"}}),
        );

        let out = run("inkwell-welcome-new-user", request("user/created", data.clone(), steps.clone())).await;
        let Outcome::Step(op) = out else {
            panic!("expected sleep op");
        };
        assert_eq!(op.display_name, "wait-before-tips");
        assert_eq!(op.name, "1h");

        steps.insert(hash_step_id("wait-before-tips"), Value::Null);
        steps.insert(
            hash_step_id("send-onboarding-tips"),
            json!({"data": {"sent": true, "timestamp": "2026-01-01T01:00:00.000Z"}}),
        );
        let out = run("inkwell-welcome-new-user", request("user/created", data, steps)).await;
        let Outcome::Complete(output) = out else {
            panic!("expected completion");
        };
        assert_eq!(
            output,
            json!({"uid": "u1", "welcomeEmailSent": true, "onboardingTipsSent": true})
        );
    }

    #[tokio::test]
    async fn welcome_for_missing_profile_fails() {
        let data = json!({"uid": "ghost", "email": "g@example.com", "signUpMethod": "email"});
        let out = run("inkwell-welcome-new-user", request("user/created", data, HashMap::new())).await;
        assert!(matches!(out, Outcome::Failed { .. }));
    }

    #[tokio::test]
    async fn post_activity_action_from_event_name() {
        let data = json!({"postId": "p1", "authorId": "a1"});
        let mut steps = HashMap::new();
        steps.insert(hash_step_id("log-post-activity"), json!({"data": {"logged": true}}));

        let out = run("inkwell-notify-post-activity", request("post/deleted", data, steps)).await;
        let Outcome::Complete(output) = out else {
            panic!("expected completion");
        };
        assert_eq!(output, json!({"action": "deleted", "postId": "p1", "logged": true}));
    }
}
