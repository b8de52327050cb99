// Core record types shared by the workflow and notification engines

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Fresh random identifier
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

record_id!(
    /// Identifier of a memo, stable for the memo's lifetime
    MemoId
);
record_id!(ApprovalId);
record_id!(NotificationId);
record_id!(
    /// Authenticated user (author, approver or notification recipient)
    UserId
);

/// Memo lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoStatus {
    Draft,
    Pending,
    Approved,
    Rejected,
}

impl MemoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoStatus::Draft => "draft",
            MemoStatus::Pending => "pending",
            MemoStatus::Approved => "approved",
            MemoStatus::Rejected => "rejected",
        }
    }

    /// `approved` and `rejected` end the normal lifecycle
    pub fn is_terminal(&self) -> bool {
        matches!(self, MemoStatus::Approved | MemoStatus::Rejected)
    }
}

impl fmt::Display for MemoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for MemoStatus {
    fn default() -> Self {
        MemoStatus::Draft
    }
}

/// Status of a single reviewer's decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "pending",
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ApprovalStatus::Pending)
    }

    /// Memo status this approval status corresponds to
    pub fn as_memo_status(&self) -> MemoStatus {
        match self {
            ApprovalStatus::Pending => MemoStatus::Pending,
            ApprovalStatus::Approved => MemoStatus::Approved,
            ApprovalStatus::Rejected => MemoStatus::Rejected,
        }
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Memo {
    pub id: MemoId,
    pub title: String,
    pub content: String,
    pub department: Option<String>,
    pub status: MemoStatus,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert payload for the `memos` collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMemo {
    pub title: String,
    pub content: String,
    pub department: Option<String>,
    pub status: MemoStatus,
    pub created_by: UserId,
}

/// Partial update of a memo. `None` leaves a field untouched; the nested
/// option on `department` distinguishes "clear" from "keep".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub department: Option<Option<String>>,
    pub status: Option<MemoStatus>,
}

impl MemoPatch {
    pub fn status(status: MemoStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.content.is_none()
            && self.department.is_none()
            && self.status.is_none()
    }

    pub fn apply_to(&self, memo: &mut Memo) {
        if let Some(title) = &self.title {
            memo.title = title.clone();
        }
        if let Some(content) = &self.content {
            memo.content = content.clone();
        }
        if let Some(department) = &self.department {
            memo.department = department.clone();
        }
        if let Some(status) = self.status {
            memo.status = status;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalRecord {
    pub id: ApprovalId,
    pub memo_id: MemoId,
    pub approver_id: Option<UserId>,
    pub status: ApprovalStatus,
    pub approval_date: Option<DateTime<Utc>>,
    pub comments: Option<String>,
}

/// Upsert payload for `memo_approvals`, keyed by `memo_id` (single current reviewer)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalUpsert {
    pub memo_id: MemoId,
    pub approver_id: Option<UserId>,
    pub status: ApprovalStatus,
    pub approval_date: Option<DateTime<Utc>>,
    pub comments: Option<String>,
}

impl ApprovalUpsert {
    /// Undecided record written on submission and resubmission
    pub fn pending(memo_id: MemoId) -> Self {
        Self {
            memo_id,
            approver_id: None,
            status: ApprovalStatus::Pending,
            approval_date: None,
            comments: None,
        }
    }
}

/// Maps a wire enum to its lowercase name and back. Parsing returns `None`
/// for unknown values so callers choose the fallback.
macro_rules! wire_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $wire:literal),+ $(,)? } default $default:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "lowercase")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire),+
                }
            }

            pub fn parse(raw: &str) -> Option<Self> {
                match raw {
                    $($wire => Some($name::$variant),)+
                    _ => None,
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                $name::$default
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

wire_enum!(
    /// Visual tone of a notification
    NotificationType {
        Info => "info",
        Success => "success",
        Warning => "warning",
        Error => "error",
    } default Info
);

wire_enum!(
    NotificationCategory {
        General => "general",
        Memo => "memo",
        Task => "task",
        Leave => "leave",
        Document => "document",
        System => "system",
    } default General
);

wire_enum!(
    NotificationPriority {
        Low => "low",
        Normal => "normal",
        High => "high",
        Urgent => "urgent",
    } default Normal
);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: UserId,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub category: NotificationCategory,
    pub priority: NotificationPriority,
    pub is_read: bool,
    pub action_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for the `notifications` collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewNotification {
    pub user_id: UserId,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub category: NotificationCategory,
    pub priority: NotificationPriority,
    pub action_url: Option<String>,
}

/// Collection names as exposed by the record store and channel transport
pub mod collections {
    pub const MEMOS: &str = "memos";
    pub const MEMO_APPROVALS: &str = "memo_approvals";
    pub const NOTIFICATIONS: &str = "notifications";
}
