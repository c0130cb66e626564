// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Step tools: the replay side of durable execution.
//!
//! The workflow service calls a function once per step. Each call carries the
//! results of every step finished so far; the handler replays from the top,
//! skipping memoized steps, and stops at the first new one by returning
//! [`JobError::Interrupt`] with the op to report.

use crate::jobs::{GeneratorOp, JobError, OpCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use sha1::{Digest, Sha1};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

pub struct StepTools {
    memo: HashMap<String, Value>,
    seen: Mutex<HashMap<String, usize>>,
}

impl StepTools {
    pub fn new(memo: HashMap<String, Value>) -> Self {
        Self {
            memo,
            seen: Mutex::new(HashMap::new()),
        }
    }

    /// Stable id for the next use of `name`. The n-th repeat of a name gets
    /// an `:n` suffix before hashing.
    fn next_id(&self, name: &str) -> String {
        let mut seen = self.seen.lock().unwrap_or_else(|e| e.into_inner());
        let count = seen.entry(name.to_string()).or_insert(0);
        let key = if *count == 0 {
            name.to_string()
        } else {
            format!("{name}:{count}")
        };
        *count += 1;
        hash_step_id(&key)
    }

    /// Run `f` once across all invocations of the function and return its
    /// result.
    pub async fn run<T, F, Fut>(&self, name: &str, f: F) -> Result<T, JobError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let id = self.next_id(name);

        if let Some(stored) = self.memo.get(&id) {
            let data = unwrap_memo(name, stored)?;
            return serde_json::from_value(data)
                .map_err(|e| JobError::Failed(anyhow::anyhow!("step {name}: bad memo: {e}")));
        }

        tracing::debug!(step = name, "Running step");
        let output = f()
            .await
            .map_err(|e| JobError::Failed(e.context(format!("step {name}"))))?;
        let data = serde_json::to_value(&output)
            .map_err(|e| JobError::Failed(anyhow::anyhow!("step {name}: {e}")))?;

        Err(JobError::Interrupt(Box::new(GeneratorOp {
            id,
            op: OpCode::Step,
            name: name.to_string(),
            display_name: name.to_string(),
            data: Some(data),
        })))
    }

    /// Pause the function. Returns immediately once the service has replayed
    /// the sleep as finished.
    pub fn sleep(&self, name: &str, duration: Duration) -> Result<(), JobError> {
        let id = self.next_id(name);
        if self.memo.contains_key(&id) {
            return Ok(());
        }

        tracing::debug!(step = name, secs = duration.as_secs(), "Scheduling sleep");
        Err(JobError::Interrupt(Box::new(GeneratorOp {
            id,
            op: OpCode::Sleep,
            name: format_duration(duration),
            display_name: name.to_string(),
            data: None,
        })))
    }
}

pub fn hash_step_id(key: &str) -> String {
    hex::encode(Sha1::digest(key.as_bytes()))
}

/// Memoized results arrive wrapped as `{"data": ...}` / `{"error": ...}`,
/// as the typed `{"type": "data", "data": ...}` form, or as the bare value.
fn unwrap_memo(name: &str, stored: &Value) -> Result<Value, JobError> {
    let Some(obj) = stored.as_object() else {
        return Ok(stored.clone());
    };

    let kind = match obj.get("type").and_then(Value::as_str) {
        Some(kind @ ("data" | "error")) if obj.len() <= 2 && obj.contains_key(kind) => kind,
        Some(_) => return Ok(stored.clone()),
        None if obj.len() == 1 && obj.contains_key("data") => "data",
        None if obj.len() == 1 && obj.contains_key("error") => "error",
        None => return Ok(stored.clone()),
    };

    let value = obj.get(kind).cloned().unwrap_or(Value::Null);
    if kind == "error" {
        return Err(JobError::Failed(anyhow::anyhow!(
            "step {name} failed: {value}"
        )));
    }
    Ok(value)
}

/// Duration in the service's compact form (`1s`, `1h`, `90s`).
fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs > 0 && secs % 3600 == 0 {
        format!("{}h", secs / 3600)
    } else if secs > 0 && secs % 60 == 0 {
        format!("{}m", secs / 60)
    } else if secs > 0 {
        format!("{secs}s")
    } else {
        format!("{}ms", d.as_millis())
    }
}
