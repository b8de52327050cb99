// Channel transport wire types

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionId(pub String);

impl SubscriptionId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventType {
    Insert,
    Update,
    Delete,
}

/// A change to one row of a collection, as delivered by the transport.
/// Rows are untyped at this boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    #[serde(rename = "eventType")]
    pub event_type: EventType,
    #[serde(default)]
    pub new: Option<Value>,
    #[serde(default)]
    pub old: Option<Value>,
}

impl RawEvent {
    pub fn insert(row: Value) -> Self {
        Self {
            event_type: EventType::Insert,
            new: Some(row),
            old: None,
        }
    }

    pub fn update(row: Value) -> Self {
        Self {
            event_type: EventType::Update,
            new: Some(row),
            old: None,
        }
    }

    pub fn delete(id: &str) -> Self {
        Self {
            event_type: EventType::Delete,
            new: None,
            old: Some(serde_json::json!({ "id": id })),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChannelMessage {
    Event(RawEvent),
    /// The transport dropped the subscription; no further events follow
    Closed { reason: String },
}

/// Conceptual row filter applied by the transport. Consumers must still
/// check ownership themselves.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionFilter {
    pub user_id: Option<String>,
}

impl SubscriptionFilter {
    pub fn for_user(user_id: &str) -> Self {
        Self {
            user_id: Some(user_id.to_string()),
        }
    }

    pub fn matches(&self, event: &RawEvent) -> bool {
        let Some(user_id) = &self.user_id else {
            return true;
        };
        // Deletes only carry the id, so they pass through.
        match event.new.as_ref().and_then(|row| row.get("user_id")) {
            Some(Value::String(owner)) => owner == user_id,
            Some(_) => false,
            None => event.event_type == EventType::Delete,
        }
    }
}

/// An active subscription: ordered event receiver plus the id used to cancel it
#[derive(Debug)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub collection: String,
    pub events: mpsc::UnboundedReceiver<ChannelMessage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    #[error("subscription to {collection} rejected: {reason}")]
    SubscribeFailed { collection: String, reason: String },

    #[error("subscription dropped: {reason}")]
    Dropped { reason: String },
}
