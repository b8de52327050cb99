// In-memory record store used by tests and embedders without a remote backend

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

use super::traits::*;
use super::types::*;
use crate::channel::{LocalChannel, RawEvent};

/// Store operations that can be made to fail once via [`InMemoryStore::fail_next`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    InsertMemo,
    GetMemo,
    UpdateMemo,
    DeleteMemo,
    MemosByAuthor,
    UpsertApproval,
    ApprovalsForMemo,
    DeleteApprovals,
    RecentNotifications,
    InsertNotification,
    MarkRead,
    MarkAllRead,
    DeleteNotification,
}

impl StoreOp {
    fn collection(&self) -> &'static str {
        match self {
            StoreOp::InsertMemo
            | StoreOp::GetMemo
            | StoreOp::UpdateMemo
            | StoreOp::DeleteMemo
            | StoreOp::MemosByAuthor => collections::MEMOS,
            StoreOp::UpsertApproval | StoreOp::ApprovalsForMemo | StoreOp::DeleteApprovals => {
                collections::MEMO_APPROVALS
            }
            _ => collections::NOTIFICATIONS,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            StoreOp::InsertMemo | StoreOp::InsertNotification => "insert",
            StoreOp::GetMemo
            | StoreOp::MemosByAuthor
            | StoreOp::ApprovalsForMemo
            | StoreOp::RecentNotifications => "select",
            StoreOp::UpdateMemo | StoreOp::MarkRead | StoreOp::MarkAllRead => "update",
            StoreOp::UpsertApproval => "upsert",
            StoreOp::DeleteMemo | StoreOp::DeleteApprovals | StoreOp::DeleteNotification => {
                "delete"
            }
        }
    }
}

#[derive(Debug, Default)]
struct Tables {
    memos: HashMap<MemoId, Memo>,
    approvals: Vec<ApprovalRecord>,
    // insertion order; newest last
    notifications: Vec<Notification>,
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
    faults: Mutex<HashSet<StoreOp>>,
    channel: Option<Arc<LocalChannel>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish every row change to `channel`, like a realtime-enabled backend
    pub fn with_channel(channel: Arc<LocalChannel>) -> Self {
        Self {
            channel: Some(channel),
            ..Default::default()
        }
    }

    /// Make the next call of `op` fail with a backend error
    pub fn fail_next(&self, op: StoreOp) {
        lock(&self.faults).insert(op);
    }

    /// Insert a notification row as-is, without publishing a change event
    pub fn seed_notification(&self, notification: Notification) {
        lock(&self.tables).notifications.push(notification);
    }

    pub fn memo(&self, id: &MemoId) -> Option<Memo> {
        lock(&self.tables).memos.get(id).cloned()
    }

    pub fn approvals(&self, memo_id: &MemoId) -> Vec<ApprovalRecord> {
        lock(&self.tables)
            .approvals
            .iter()
            .filter(|record| &record.memo_id == memo_id)
            .cloned()
            .collect()
    }

    pub fn notifications_for(&self, user: &UserId) -> Vec<Notification> {
        lock(&self.tables)
            .notifications
            .iter()
            .filter(|n| &n.user_id == user)
            .cloned()
            .collect()
    }

    fn check(&self, op: StoreOp) -> Result<(), StoreError> {
        if lock(&self.faults).remove(&op) {
            debug!(?op, "Injected store failure");
            return Err(StoreError::backend(op.collection(), op.name(), "injected failure"));
        }
        Ok(())
    }

    fn publish<T: serde::Serialize>(&self, collection: &str, build: fn(serde_json::Value) -> RawEvent, row: &T) {
        if let Some(channel) = &self.channel {
            if let Ok(value) = serde_json::to_value(row) {
                channel.publish(collection, build(value));
            }
        }
    }

    fn publish_delete(&self, collection: &str, id: &str) {
        if let Some(channel) = &self.channel {
            channel.publish(collection, RawEvent::delete(id));
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl MemoStore for InMemoryStore {
    async fn insert_memo(&self, memo: NewMemo) -> Result<Memo, StoreError> {
        self.check(StoreOp::InsertMemo)?;
        let now = Utc::now();
        let memo = Memo {
            id: MemoId::generate(),
            title: memo.title,
            content: memo.content,
            department: memo.department,
            status: memo.status,
            created_by: memo.created_by,
            created_at: now,
            updated_at: now,
        };
        lock(&self.tables).memos.insert(memo.id.clone(), memo.clone());
        self.publish(collections::MEMOS, RawEvent::insert, &memo);
        Ok(memo)
    }

    async fn get_memo(&self, id: &MemoId) -> Result<Option<Memo>, StoreError> {
        self.check(StoreOp::GetMemo)?;
        Ok(lock(&self.tables).memos.get(id).cloned())
    }

    async fn update_memo(&self, id: &MemoId, patch: &MemoPatch) -> Result<Memo, StoreError> {
        self.check(StoreOp::UpdateMemo)?;
        let updated = {
            let mut tables = lock(&self.tables);
            let memo = tables.memos.get_mut(id).ok_or_else(|| StoreError::NotFound {
                collection: collections::MEMOS,
                id: id.to_string(),
            })?;
            patch.apply_to(memo);
            memo.updated_at = Utc::now();
            memo.clone()
        };
        self.publish(collections::MEMOS, RawEvent::update, &updated);
        Ok(updated)
    }

    async fn delete_memo(&self, id: &MemoId) -> Result<(), StoreError> {
        self.check(StoreOp::DeleteMemo)?;
        let removed = lock(&self.tables).memos.remove(id);
        if removed.is_none() {
            return Err(StoreError::NotFound {
                collection: collections::MEMOS,
                id: id.to_string(),
            });
        }
        self.publish_delete(collections::MEMOS, id.as_str());
        Ok(())
    }

    async fn memos_by_author(&self, author: &UserId) -> Result<Vec<Memo>, StoreError> {
        self.check(StoreOp::MemosByAuthor)?;
        let mut memos: Vec<Memo> = lock(&self.tables)
            .memos
            .values()
            .filter(|memo| &memo.created_by == author)
            .cloned()
            .collect();
        memos.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(memos)
    }
}

#[async_trait]
impl ApprovalStore for InMemoryStore {
    async fn upsert_approval(&self, upsert: ApprovalUpsert) -> Result<ApprovalRecord, StoreError> {
        self.check(StoreOp::UpsertApproval)?;
        let (record, inserted) = {
            let mut tables = lock(&self.tables);
            match tables
                .approvals
                .iter_mut()
                .find(|record| record.memo_id == upsert.memo_id)
            {
                Some(existing) => {
                    existing.approver_id = upsert.approver_id;
                    existing.status = upsert.status;
                    existing.approval_date = upsert.approval_date;
                    existing.comments = upsert.comments;
                    (existing.clone(), false)
                }
                None => {
                    let record = ApprovalRecord {
                        id: ApprovalId::generate(),
                        memo_id: upsert.memo_id,
                        approver_id: upsert.approver_id,
                        status: upsert.status,
                        approval_date: upsert.approval_date,
                        comments: upsert.comments,
                    };
                    tables.approvals.push(record.clone());
                    (record, true)
                }
            }
        };
        let build: fn(serde_json::Value) -> RawEvent = if inserted {
            RawEvent::insert
        } else {
            RawEvent::update
        };
        self.publish(collections::MEMO_APPROVALS, build, &record);
        Ok(record)
    }

    async fn approvals_for_memo(&self, memo_id: &MemoId) -> Result<Vec<ApprovalRecord>, StoreError> {
        self.check(StoreOp::ApprovalsForMemo)?;
        Ok(self.approvals(memo_id))
    }

    async fn delete_approvals_for_memo(&self, memo_id: &MemoId) -> Result<usize, StoreError> {
        self.check(StoreOp::DeleteApprovals)?;
        let removed: Vec<ApprovalRecord> = {
            let mut tables = lock(&self.tables);
            let (removed, kept) = std::mem::take(&mut tables.approvals)
                .into_iter()
                .partition(|record| &record.memo_id == memo_id);
            tables.approvals = kept;
            removed
        };
        for record in &removed {
            self.publish_delete(collections::MEMO_APPROVALS, record.id.as_str());
        }
        Ok(removed.len())
    }
}

#[async_trait]
impl NotificationStore for InMemoryStore {
    async fn recent_notifications(&self, user: &UserId, limit: usize) -> Result<Vec<Notification>, StoreError> {
        self.check(StoreOp::RecentNotifications)?;
        let mut rows: Vec<Notification> = lock(&self.tables)
            .notifications
            .iter()
            .rev()
            .filter(|n| &n.user_id == user)
            .cloned()
            .collect();
        // stable sort keeps later inserts first on equal timestamps
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows.truncate(limit);
        Ok(rows)
    }

    async fn insert_notification(&self, notification: NewNotification) -> Result<Notification, StoreError> {
        self.check(StoreOp::InsertNotification)?;
        let notification = Notification {
            id: NotificationId::generate(),
            user_id: notification.user_id,
            title: notification.title,
            message: notification.message,
            kind: notification.kind,
            category: notification.category,
            priority: notification.priority,
            is_read: false,
            action_url: notification.action_url,
            created_at: Utc::now(),
        };
        lock(&self.tables).notifications.push(notification.clone());
        self.publish(collections::NOTIFICATIONS, RawEvent::insert, &notification);
        Ok(notification)
    }

    async fn mark_read(&self, id: &NotificationId) -> Result<(), StoreError> {
        self.check(StoreOp::MarkRead)?;
        let updated = {
            let mut tables = lock(&self.tables);
            let row = tables
                .notifications
                .iter_mut()
                .find(|n| &n.id == id)
                .ok_or_else(|| StoreError::NotFound {
                    collection: collections::NOTIFICATIONS,
                    id: id.to_string(),
                })?;
            row.is_read = true;
            row.clone()
        };
        self.publish(collections::NOTIFICATIONS, RawEvent::update, &updated);
        Ok(())
    }

    async fn mark_all_read(&self, user: &UserId) -> Result<(), StoreError> {
        self.check(StoreOp::MarkAllRead)?;
        let changed: Vec<Notification> = {
            let mut tables = lock(&self.tables);
            tables
                .notifications
                .iter_mut()
                .filter(|n| &n.user_id == user && !n.is_read)
                .map(|n| {
                    n.is_read = true;
                    n.clone()
                })
                .collect()
        };
        for row in &changed {
            self.publish(collections::NOTIFICATIONS, RawEvent::update, row);
        }
        Ok(())
    }

    async fn delete_notification(&self, id: &NotificationId) -> Result<(), StoreError> {
        self.check(StoreOp::DeleteNotification)?;
        let removed = {
            let mut tables = lock(&self.tables);
            let before = tables.notifications.len();
            tables.notifications.retain(|n| &n.id != id);
            before != tables.notifications.len()
        };
        if removed {
            self.publish_delete(collections::NOTIFICATIONS, id.as_str());
        }
        Ok(())
    }
}
