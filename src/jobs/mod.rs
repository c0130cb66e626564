// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Background job handlers run by the workflow service.
//!
//! The service owns durability: it stores step results, schedules sleeps and
//! retries. This module only executes one slice of a function per request and
//! reports what happened.

pub mod hello;
pub mod step;

use crate::models::events::EventEnvelope;
use crate::services::workflow::{function_id, FunctionConfig};
use crate::services::UserService;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

pub use step::StepTools;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpCode {
    Step,
    Sleep,
}

/// A step the handler reached that the service has not seen yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratorOp {
    pub id: String,
    pub op: OpCode,
    pub name: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[derive(Debug, thiserror::Error)]
pub enum JobError {
    /// Not a failure: a new step ran or a sleep was reached.
    #[error("interrupted at step {}", .0.display_name)]
    Interrupt(Box<GeneratorOp>),
    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunContext {
    #[serde(default)]
    pub run_id: String,
    #[serde(default)]
    pub attempt: u32,
}

/// Body of an execution request.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionRequest {
    pub event: EventEnvelope,
    #[serde(default)]
    pub steps: HashMap<String, Value>,
    #[serde(default)]
    pub ctx: RunContext,
}

/// Services available to job handlers.
pub struct JobDeps {
    pub users: Arc<UserService>,
}

pub struct JobContext<'a> {
    pub event: &'a EventEnvelope,
    pub step: &'a StepTools,
    pub deps: &'a JobDeps,
}

#[async_trait]
pub trait JobFunction: Send + Sync {
    /// Function id within the app (`hello-world`).
    fn slug(&self) -> &'static str;
    fn name(&self) -> &'static str;
    /// Event names that start a run.
    fn triggers(&self) -> &'static [&'static str];
    async fn run(&self, ctx: JobContext<'_>) -> Result<Value, JobError>;
}

/// Result of executing one slice of a function.
#[derive(Debug)]
pub enum Outcome {
    Complete(Value),
    Step(GeneratorOp),
    Failed { name: String, message: String },
}

pub struct JobRegistry {
    functions: Vec<Arc<dyn JobFunction>>,
}

impl JobRegistry {
    pub fn new(functions: Vec<Arc<dyn JobFunction>>) -> Self {
        Self { functions }
    }

    /// All functions this app serves.
    pub fn standard() -> Self {
        Self::new(vec![
            Arc::new(hello::HelloWorld),
            Arc::new(hello::WelcomeNewUser),
            Arc::new(hello::NotifyPostActivity),
        ])
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Look up by fully-qualified id (`inkwell-hello-world`).
    pub fn find(&self, fn_id: &str) -> Option<&Arc<dyn JobFunction>> {
        self.functions
            .iter()
            .find(|f| function_id(f.slug()) == fn_id)
    }

    pub fn configs(&self, serve_url: &str) -> Vec<FunctionConfig> {
        self.functions
            .iter()
            .map(|f| FunctionConfig::new(f.slug(), f.name(), f.triggers(), serve_url))
            .collect()
    }

    pub async fn execute(
        &self,
        function: &dyn JobFunction,
        request: ExecutionRequest,
        deps: &JobDeps,
    ) -> Outcome {
        let step = StepTools::new(request.steps);
        let ctx = JobContext {
            event: &request.event,
            step: &step,
            deps,
        };

        match function.run(ctx).await {
            Ok(output) => {
                tracing::info!(
                    function = function.slug(),
                    run_id = %request.ctx.run_id,
                    "Function completed"
                );
                Outcome::Complete(output)
            }
            Err(JobError::Interrupt(op)) => {
                tracing::debug!(
                    function = function.slug(),
                    run_id = %request.ctx.run_id,
                    step = %op.display_name,
                    "Function reported step"
                );
                Outcome::Step(*op)
            }
            Err(JobError::Failed(e)) => {
                tracing::error!(
                    function = function.slug(),
                    run_id = %request.ctx.run_id,
                    attempt = request.ctx.attempt,
                    error = format!("{e:#}"),
                    "Function failed"
                );
                Outcome::Failed {
                    name: "Error".to_string(),
                    message: format!("{e:#}"),
                }
            }
        }
    }
}
