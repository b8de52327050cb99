// Lenient decoding of notification rows arriving from the channel transport
//
// Every field is untyped at this boundary. Enum fields go through an
// exhaustive match with a single default branch; only a missing `id` or
// `user_id` rejects the row.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::records::{
    Notification, NotificationCategory, NotificationId, NotificationPriority, NotificationType,
    UserId,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("row is not an object")]
    NotAnObject,
    #[error("row has no usable {0}")]
    MissingField(&'static str),
}

/// A decoded row plus the fields that fell back to their defaults
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    pub notification: Notification,
    pub fallbacks: Vec<&'static str>,
}

pub fn decode_notification(row: &Value) -> Result<Decoded, DecodeError> {
    let fields = row.as_object().ok_or(DecodeError::NotAnObject)?;
    let mut fallbacks = Vec::new();

    let id = identifier(fields, "id")
        .map(NotificationId)
        .ok_or(DecodeError::MissingField("id"))?;
    let user_id = identifier(fields, "user_id")
        .map(UserId)
        .ok_or(DecodeError::MissingField("user_id"))?;

    let kind = enum_field(fields, "type", NotificationType::parse, &mut fallbacks);
    let category = enum_field(fields, "category", NotificationCategory::parse, &mut fallbacks);
    let priority = enum_field(fields, "priority", NotificationPriority::parse, &mut fallbacks);

    let is_read = match fields.get("is_read") {
        Some(Value::Bool(read)) => *read,
        _ => {
            fallbacks.push("is_read");
            false
        }
    };

    let created_at = match fields
        .get("created_at")
        .and_then(Value::as_str)
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
    {
        Some(timestamp) => timestamp.with_timezone(&Utc),
        None => {
            fallbacks.push("created_at");
            Utc::now()
        }
    };

    Ok(Decoded {
        notification: Notification {
            id,
            user_id,
            title: text(fields, "title").unwrap_or_default(),
            message: text(fields, "message").unwrap_or_default(),
            kind,
            category,
            priority,
            is_read,
            action_url: text(fields, "action_url").filter(|url| !url.is_empty()),
            created_at,
        },
        fallbacks,
    })
}

/// Id carried by a DELETE event's `old` row
pub fn decode_row_id(row: &Value) -> Option<NotificationId> {
    row.as_object()
        .and_then(|fields| identifier(fields, "id"))
        .map(NotificationId)
}

fn identifier(fields: &Map<String, Value>, key: &str) -> Option<String> {
    match fields.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn text(fields: &Map<String, Value>, key: &str) -> Option<String> {
    fields.get(key).and_then(Value::as_str).map(str::to_string)
}

fn enum_field<T: Default>(
    fields: &Map<String, Value>,
    key: &'static str,
    parse: fn(&str) -> Option<T>,
    fallbacks: &mut Vec<&'static str>,
) -> T {
    match fields.get(key).and_then(Value::as_str).and_then(parse) {
        Some(value) => value,
        None => {
            fallbacks.push(key);
            T::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row() -> Value {
        json!({
            "id": "n1",
            "user_id": "alice",
            "title": "Memo approved",
            "message": "Q3 Budget was approved",
            "type": "success",
            "category": "memo",
            "priority": "high",
            "is_read": false,
            "action_url": "/memos/m1",
            "created_at": "2026-10-01T09:30:00+00:00"
        })
    }

    #[test]
    fn test_well_formed_row_has_no_fallbacks() {
        let decoded = decode_notification(&row()).unwrap();
        assert!(decoded.fallbacks.is_empty());
        assert_eq!(decoded.notification.kind, NotificationType::Success);
        assert_eq!(decoded.notification.priority, NotificationPriority::High);
        assert_eq!(decoded.notification.action_url.as_deref(), Some("/memos/m1"));
    }

    #[test]
    fn test_unknown_priority_becomes_normal() {
        let mut value = row();
        value["priority"] = json!("critical");

        let decoded = decode_notification(&value).unwrap();
        assert_eq!(decoded.notification.priority, NotificationPriority::Normal);
        assert_eq!(decoded.fallbacks, vec!["priority"]);
    }

    #[test]
    fn test_missing_and_mistyped_fields_use_defaults() {
        let value = json!({
            "id": 42,
            "user_id": "alice",
            "type": 7,
            "category": null,
            "is_read": "yes",
            "created_at": "yesterday"
        });

        let decoded = decode_notification(&value).unwrap();
        let n = decoded.notification;
        assert_eq!(n.id, NotificationId::from("42"));
        assert_eq!(n.kind, NotificationType::Info);
        assert_eq!(n.category, NotificationCategory::General);
        assert_eq!(n.priority, NotificationPriority::Normal);
        assert!(!n.is_read);
        assert_eq!(n.title, "");
        assert_eq!(
            decoded.fallbacks,
            vec!["type", "category", "priority", "is_read", "created_at"]
        );
    }

    #[test]
    fn test_rows_without_identity_are_rejected() {
        assert_eq!(
            decode_notification(&json!({ "user_id": "alice" })).unwrap_err(),
            DecodeError::MissingField("id")
        );
        assert_eq!(
            decode_notification(&json!({ "id": "n1", "user_id": "" })).unwrap_err(),
            DecodeError::MissingField("user_id")
        );
        assert_eq!(
            decode_notification(&json!(["n1"])).unwrap_err(),
            DecodeError::NotAnObject
        );
    }

    #[test]
    fn test_delete_id_extraction() {
        assert_eq!(
            decode_row_id(&json!({ "id": "n9" })),
            Some(NotificationId::from("n9"))
        );
        assert_eq!(decode_row_id(&json!({})), None);
    }
}
