// Record store seams - one trait per collection so engines depend only on what they touch

use async_trait::async_trait;
use thiserror::Error;

#[cfg(any(test, feature = "testing"))]
use mockall::automock;

use super::types::*;

/// Failures reported by a record store backend
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("{collection} record {id} not found")]
    NotFound { collection: &'static str, id: String },

    #[error("{collection} {operation} failed: {message}")]
    Backend {
        collection: &'static str,
        operation: &'static str,
        message: String,
    },
}

impl StoreError {
    pub fn backend(collection: &'static str, operation: &'static str, message: impl Into<String>) -> Self {
        StoreError::Backend {
            collection,
            operation,
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

/// Operations on the `memos` collection
#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait MemoStore: Send + Sync {
    /// Persist a new memo, assigning id and timestamps
    async fn insert_memo(&self, memo: NewMemo) -> Result<Memo, StoreError>;

    async fn get_memo(&self, id: &MemoId) -> Result<Option<Memo>, StoreError>;

    /// Apply a partial update and return the stored row
    async fn update_memo(&self, id: &MemoId, patch: &MemoPatch) -> Result<Memo, StoreError>;

    async fn delete_memo(&self, id: &MemoId) -> Result<(), StoreError>;

    /// All memos created by `author`, newest first
    async fn memos_by_author(&self, author: &UserId) -> Result<Vec<Memo>, StoreError>;
}

/// Operations on the `memo_approvals` collection
#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait ApprovalStore: Send + Sync {
    /// Insert or overwrite the approval record whose `memo_id` matches
    async fn upsert_approval(&self, upsert: ApprovalUpsert) -> Result<ApprovalRecord, StoreError>;

    async fn approvals_for_memo(&self, memo_id: &MemoId) -> Result<Vec<ApprovalRecord>, StoreError>;

    /// Returns the number of records removed
    async fn delete_approvals_for_memo(&self, memo_id: &MemoId) -> Result<usize, StoreError>;
}

/// Operations on the `notifications` collection
#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Most recent notifications for `user`, newest first, at most `limit`
    async fn recent_notifications(&self, user: &UserId, limit: usize) -> Result<Vec<Notification>, StoreError>;

    async fn insert_notification(&self, notification: NewNotification) -> Result<Notification, StoreError>;

    async fn mark_read(&self, id: &NotificationId) -> Result<(), StoreError>;

    async fn mark_all_read(&self, user: &UserId) -> Result<(), StoreError>;

    async fn delete_notification(&self, id: &NotificationId) -> Result<(), StoreError>;
}
