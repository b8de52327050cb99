//! Shared wiring for integration tests: one in-memory backend with a local
//! change feed, and engines bound to a chosen signed-in user
#![allow(dead_code, unused_macros)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Notify;
use memoflow::config::{NotificationSettings, WorkflowSettings};
use memoflow::records::*;
use memoflow::{
    ApprovalWorkflowEngine, InMemoryStore, LocalChannel, NotificationSyncEngine,
    RecordingToastSink, StaticActor,
};

pub struct Backend {
    pub channel: Arc<LocalChannel>,
    pub store: Arc<InMemoryStore>,
}

impl Backend {
    pub fn new() -> Self {
        let channel = Arc::new(LocalChannel::new());
        let store = Arc::new(InMemoryStore::with_channel(channel.clone()));
        Self { channel, store }
    }

    /// Workflow engine acting as `user`, with author notifications enabled
    pub fn workflow_as(&self, user: &str) -> (ApprovalWorkflowEngine, Arc<RecordingToastSink>) {
        let toasts = Arc::new(RecordingToastSink::new());
        let engine = ApprovalWorkflowEngine::new(
            self.store.clone(),
            self.store.clone(),
            Arc::new(StaticActor::signed_in(user)),
            toasts.clone(),
            WorkflowSettings::default(),
        )
        .with_notification_store(self.store.clone());
        (engine, toasts)
    }

    pub fn notification_engine(
        &self,
        settings: NotificationSettings,
    ) -> (NotificationSyncEngine, Arc<RecordingToastSink>) {
        let toasts = Arc::new(RecordingToastSink::new());
        let engine = NotificationSyncEngine::new(
            self.store.clone(),
            self.channel.clone(),
            toasts.clone(),
            settings,
        );
        (engine, toasts)
    }

    pub fn seed(&self, id: &str, user: &str, is_read: bool, minutes_ago: i64) {
        self.store.seed_notification(notification(id, user, is_read, minutes_ago));
    }
}

pub fn notification(id: &str, user: &str, is_read: bool, minutes_ago: i64) -> Notification {
    Notification {
        id: NotificationId::from(id),
        user_id: UserId::from(user),
        title: format!("Notification {id}"),
        message: String::new(),
        kind: NotificationType::Info,
        category: NotificationCategory::General,
        priority: NotificationPriority::Normal,
        is_read,
        action_url: None,
        created_at: Utc::now() - chrono::Duration::minutes(minutes_ago),
    }
}

/// Pauses one armed read after it has taken its snapshot, so a test can
/// interleave writes with an in-flight read
#[derive(Debug, Default)]
pub struct ReadGate {
    armed: AtomicBool,
    pub entered: Notify,
    pub release: Notify,
}

impl ReadGate {
    pub fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    async fn pass(&self) {
        if self.armed.swap(false, Ordering::SeqCst) {
            self.entered.notify_one();
            self.release.notified().await;
        }
    }
}

/// Store whose author listing and recent-notification reads can be held open
pub struct GatedStore {
    pub inner: Arc<InMemoryStore>,
    pub gate: ReadGate,
}

impl GatedStore {
    pub fn new(inner: Arc<InMemoryStore>) -> Self {
        Self {
            inner,
            gate: ReadGate::default(),
        }
    }
}

#[async_trait]
impl MemoStore for GatedStore {
    async fn insert_memo(&self, memo: NewMemo) -> Result<Memo, StoreError> {
        self.inner.insert_memo(memo).await
    }

    async fn get_memo(&self, id: &MemoId) -> Result<Option<Memo>, StoreError> {
        self.inner.get_memo(id).await
    }

    async fn update_memo(&self, id: &MemoId, patch: &MemoPatch) -> Result<Memo, StoreError> {
        self.inner.update_memo(id, patch).await
    }

    async fn delete_memo(&self, id: &MemoId) -> Result<(), StoreError> {
        self.inner.delete_memo(id).await
    }

    async fn memos_by_author(&self, author: &UserId) -> Result<Vec<Memo>, StoreError> {
        let rows = self.inner.memos_by_author(author).await;
        self.gate.pass().await;
        rows
    }
}

#[async_trait]
impl NotificationStore for GatedStore {
    async fn recent_notifications(&self, user: &UserId, limit: usize) -> Result<Vec<Notification>, StoreError> {
        let rows = self.inner.recent_notifications(user, limit).await;
        self.gate.pass().await;
        rows
    }

    async fn insert_notification(&self, notification: NewNotification) -> Result<Notification, StoreError> {
        self.inner.insert_notification(notification).await
    }

    async fn mark_read(&self, id: &NotificationId) -> Result<(), StoreError> {
        self.inner.mark_read(id).await
    }

    async fn mark_all_read(&self, user: &UserId) -> Result<(), StoreError> {
        self.inner.mark_all_read(user).await
    }

    async fn delete_notification(&self, id: &NotificationId) -> Result<(), StoreError> {
        self.inner.delete_notification(id).await
    }
}

/// Settings with a short backoff so recovery tests stay fast
pub fn fast_settings() -> NotificationSettings {
    NotificationSettings {
        resubscribe_backoff_ms: 10,
        ..NotificationSettings::default()
    }
}

/// Poll an async condition until it holds or about two seconds pass
macro_rules! eventually {
    ($condition:expr) => {
        async {
            for _ in 0..400 {
                if $condition {
                    return true;
                }
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            }
            false
        }
        .await
    };
}
