// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Typed event schemas exchanged with the workflow service.
//!
//! On the wire an event is `{"name": "...", "data": {...}}`, optionally with an
//! `id` and a millisecond `ts` added by the service.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use validator::Validate;

pub const HELLO_WORLD: &str = "test/hello.world";
pub const USER_CREATED: &str = "user/created";
pub const USER_UPDATED: &str = "user/updated";
pub const POST_CREATED: &str = "post/created";
pub const POST_UPDATED: &str = "post/updated";
pub const POST_DELETED: &str = "post/deleted";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct HelloWorldData {
    #[validate(email)]
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UserCreatedData {
    #[validate(length(min = 1))]
    pub uid: String,
    #[validate(email)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub sign_up_method: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct UserUpdatedData {
    #[validate(length(min = 1))]
    pub uid: String,
    pub updates: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PostCreatedData {
    #[validate(length(min = 1))]
    pub post_id: String,
    pub author_id: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PostUpdatedData {
    #[validate(length(min = 1))]
    pub post_id: String,
    pub author_id: String,
    pub updates: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PostDeletedData {
    #[validate(length(min = 1))]
    pub post_id: String,
    pub author_id: String,
}

/// Every event this application publishes or consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", content = "data")]
pub enum Event {
    #[serde(rename = "test/hello.world")]
    HelloWorld(HelloWorldData),
    #[serde(rename = "user/created")]
    UserCreated(UserCreatedData),
    #[serde(rename = "user/updated")]
    UserUpdated(UserUpdatedData),
    #[serde(rename = "post/created")]
    PostCreated(PostCreatedData),
    #[serde(rename = "post/updated")]
    PostUpdated(PostUpdatedData),
    #[serde(rename = "post/deleted")]
    PostDeleted(PostDeletedData),
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::HelloWorld(_) => HELLO_WORLD,
            Event::UserCreated(_) => USER_CREATED,
            Event::UserUpdated(_) => USER_UPDATED,
            Event::PostCreated(_) => POST_CREATED,
            Event::PostUpdated(_) => POST_UPDATED,
            Event::PostDeleted(_) => POST_DELETED,
        }
    }

    /// Check the payload against its schema.
    pub fn validate(&self) -> Result<(), validator::ValidationErrors> {
        match self {
            Event::HelloWorld(d) => d.validate(),
            Event::UserCreated(d) => d.validate(),
            Event::UserUpdated(d) => d.validate(),
            Event::PostCreated(d) => d.validate(),
            Event::PostUpdated(d) => d.validate(),
            Event::PostDeleted(d) => d.validate(),
        }
    }

    /// The `data` object alone.
    pub fn data(&self) -> Value {
        serde_json::to_value(self)
            .ok()
            .and_then(|mut v| v.get_mut("data").map(Value::take))
            .unwrap_or(Value::Null)
    }
}

/// Event as delivered by the workflow service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub name: String,
    #[serde(default)]
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Milliseconds since the Unix epoch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ts: Option<i64>,
}

impl EventEnvelope {
    pub fn from_event(event: &Event, ts: Option<i64>) -> Self {
        Self {
            name: event.name().to_string(),
            data: event.data(),
            id: None,
            ts,
        }
    }

    /// The part of the name after the first `/`, e.g. `created` for `post/created`.
    pub fn action(&self) -> &str {
        self.name
            .split_once('/')
            .map(|(_, action)| action)
            .filter(|a| !a.is_empty())
            .unwrap_or("unknown")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn event_wire_shape() {
        let event = Event::PostCreated(PostCreatedData {
            post_id: "p1".to_string(),
            author_id: "a1".to_string(),
            title: "Hello".to_string(),
        });
        let v = serde_json::to_value(&event).unwrap();
        assert_eq!(
            v,
            json!({"name": "post/created", "data": {"postId": "p1", "authorId": "a1", "title": "Hello"}})
        );
        assert_eq!(event.name(), POST_CREATED);
        assert_eq!(event.data()["postId"], "p1");
    }

    #[test]
    fn schema_validation_checks_email() {
        let bad = Event::HelloWorld(HelloWorldData {
            email: "not-an-email".to_string(),
        });
        assert!(bad.validate().is_err());

        let good = Event::UserCreated(UserCreatedData {
            uid: "u1".to_string(),
            email: "u1@example.com".to_string(),
            display_name: None,
            sign_up_method: "email".to_string(),
        });
        assert!(good.validate().is_ok());
    }

    #[test]
    fn envelope_action() {
        let env = EventEnvelope {
            name: "post/deleted".to_string(),
            data: json!({}),
            id: None,
            ts: None,
        };
        assert_eq!(env.action(), "deleted");

        let env = EventEnvelope {
            name: "weird".to_string(),
            ..env
        };
        assert_eq!(env.action(), "unknown");
    }
}
