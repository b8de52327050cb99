// Notification sync engine - reconciles an initial fetch with the live change feed
//
// One engine per signed-in session. `start`/`stop` acquire and release the
// subscription; dropping the engine aborts the event task. Events are folded
// into the cache one at a time by a single task, and side effects run after
// the cache lock is released.

use std::sync::{Arc, Mutex as StdMutex};
use statig::prelude::*;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn, Instrument};

use crate::channel::{
    ChannelError, ChannelMessage, ChannelTransport, EventType, RawEvent, SubscriptionFilter,
    SubscriptionId,
};
use crate::config::NotificationSettings;
use crate::errors::CoreResult;
use crate::observability::{SyncMetrics, SyncStats};
use crate::records::{collections, Notification, NotificationId, NotificationStore, UserId};
use crate::telemetry::{create_sync_span, generate_correlation_id};
use crate::toast::{ToastKind, ToastSink};

use super::cache::{CacheChange, NotificationCache, SyncEffect};
use super::decode::{decode_notification, decode_row_id};
use super::session::{phase, SessionEvent, SessionPhase, SyncSession};

struct SyncState {
    cache: NotificationCache,
    session: StateMachine<SyncSession>,
}

struct Inner {
    store: Arc<dyn NotificationStore>,
    transport: Arc<dyn ChannelTransport>,
    toasts: Arc<dyn ToastSink>,
    settings: NotificationSettings,
    state: Mutex<SyncState>,
    subscription: StdMutex<Option<SubscriptionId>>,
    metrics: SyncMetrics,
}

pub struct NotificationSyncEngine {
    inner: Arc<Inner>,
    worker: StdMutex<Option<JoinHandle<()>>>,
}

impl NotificationSyncEngine {
    pub fn new(
        store: Arc<dyn NotificationStore>,
        transport: Arc<dyn ChannelTransport>,
        toasts: Arc<dyn ToastSink>,
        settings: NotificationSettings,
    ) -> Self {
        let cache = NotificationCache::new(settings.fetch_limit, settings.toast_on_insert);
        Self {
            inner: Arc::new(Inner {
                store,
                transport,
                toasts,
                settings,
                state: Mutex::new(SyncState {
                    cache,
                    session: SyncSession::default().state_machine(),
                }),
                subscription: StdMutex::new(None),
                metrics: SyncMetrics::new(),
            }),
            worker: StdMutex::new(None),
        }
    }

    /// Fetch the most recent notifications for `user`, then subscribe to changes.
    /// A previous session on this engine is stopped first. On error the engine
    /// is left idle with nothing held.
    pub async fn start(&self, user: &UserId) -> CoreResult<()> {
        self.stop().await;

        let span = create_sync_span(user.as_str(), &generate_correlation_id());
        let result = async {
            {
                let mut state = self.inner.state.lock().await;
                state.session.handle(&SessionEvent::Start {
                    user_id: user.clone(),
                });
                state.cache.clear();
            }

            let events = self.inner.connect(user).await?;
            let task = tokio::spawn(
                run_events(self.inner.clone(), user.clone(), events).in_current_span(),
            );
            *lock(&self.worker) = Some(task);

            self.inner.state.lock().await.session.handle(&SessionEvent::Live);
            Ok(())
        }
        .instrument(span)
        .await;

        if let Err(e) = &result {
            warn!(user = %user, error = %e, "Notification sync failed to start");
            self.inner.release().await;
        }
        result
    }

    /// Cancel the subscription. Safe to call repeatedly or before `start`.
    pub async fn stop(&self) {
        let task = lock(&self.worker).take();
        if let Some(task) = task {
            task.abort();
            let _ = task.await;
            self.inner.metrics.log_stats();
        }
        self.inner.release().await;
    }

    /// Write-through mark as read; the cache changes only after the store accepts
    pub async fn mark_as_read(&self, id: &NotificationId) -> CoreResult<()> {
        if let Err(e) = self.inner.store.mark_read(id).await {
            warn!(notification_id = %id, error = %e, "Failed to mark notification read");
            return Err(e.into());
        }
        let changed = self.inner.state.lock().await.cache.mark_read(id);
        debug!(notification_id = %id, changed, "Notification marked read");
        Ok(())
    }

    pub async fn mark_all_as_read(&self, user: &UserId) -> CoreResult<()> {
        if let Err(e) = self.inner.store.mark_all_read(user).await {
            warn!(user = %user, error = %e, "Failed to mark notifications read");
            return Err(e.into());
        }
        let mut state = self.inner.state.lock().await;
        if state.session.inner().user_id.as_ref() == Some(user) {
            state.cache.mark_all_read();
        }
        Ok(())
    }

    /// Write-through delete of one notification
    pub async fn delete_notification(&self, id: &NotificationId) -> CoreResult<()> {
        self.inner.store.delete_notification(id).await?;
        self.inner.state.lock().await.cache.remove(id);
        Ok(())
    }

    /// Re-run the initial fetch for the current session user
    pub async fn refresh(&self) -> CoreResult<()> {
        let user = self.inner.state.lock().await.session.inner().user_id.clone();
        match user {
            Some(user) => self.inner.refetch(&user).await,
            None => {
                debug!("Refresh requested without an active session");
                Ok(())
            }
        }
    }

    /// Cached notifications, newest first
    pub async fn notifications(&self) -> Vec<Notification> {
        self.inner.state.lock().await.cache.items().to_vec()
    }

    pub async fn unread_count(&self) -> usize {
        self.inner.state.lock().await.cache.unread_count()
    }

    pub async fn phase(&self) -> SessionPhase {
        phase(&self.inner.state.lock().await.session)
    }

    pub async fn is_live(&self) -> bool {
        self.phase().await == SessionPhase::Live
    }

    pub fn metrics(&self) -> SyncStats {
        self.inner.metrics.get_stats()
    }
}

impl Drop for NotificationSyncEngine {
    fn drop(&mut self) {
        if let Some(task) = lock(&self.worker).take() {
            task.abort();
        }

        let Some(id) = lock(&self.inner.subscription).take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let transport = self.inner.transport.clone();
                handle.spawn(async move {
                    transport.unsubscribe(&id).await;
                    debug!(subscription = %id, "Released subscription of dropped engine");
                });
            }
            Err(_) => {
                warn!(subscription = %id, "Engine dropped outside a runtime, subscription not released");
            }
        }
    }
}

impl Inner {
    /// Initial fetch followed by a fresh subscription
    async fn connect(&self, user: &UserId) -> CoreResult<mpsc::UnboundedReceiver<ChannelMessage>> {
        self.refetch(user).await?;

        let subscription = self
            .transport
            .subscribe(collections::NOTIFICATIONS, SubscriptionFilter::for_user(user.as_str()))
            .await?;
        info!(subscription = %subscription.id, "Subscribed to notification changes");
        *lock(&self.subscription) = Some(subscription.id);
        Ok(subscription.events)
    }

    /// Replace the cache with a fresh page. The state lock is held across the
    /// fetch so live events queue behind the snapshot instead of being erased.
    async fn refetch(&self, user: &UserId) -> CoreResult<()> {
        let mut state = self.state.lock().await;
        let rows = self
            .store
            .recent_notifications(user, self.settings.fetch_limit)
            .await?;
        self.metrics.record_refetch();

        state.cache.replace_all(rows);
        debug!(
            cached = state.cache.len(),
            unread = state.cache.unread_count(),
            "Notification cache refreshed"
        );
        Ok(())
    }

    /// Drop any subscription and return to idle with an empty cache
    async fn release(&self) {
        let subscription = lock(&self.subscription).take();
        if let Some(id) = subscription {
            self.transport.unsubscribe(&id).await;
        }

        let mut state = self.state.lock().await;
        state.session.handle(&SessionEvent::Stop);
        state.cache.clear();
    }

    /// Fold one event into the cache, then run its effects. Counted once done.
    async fn handle_event(&self, user: &UserId, event: RawEvent) {
        if let Some(change) = self.decode_change(user, event) {
            let effects = self.state.lock().await.cache.apply(change);
            for effect in effects {
                match effect {
                    SyncEffect::Toast { message, kind } => {
                        self.toasts.notify(&message, kind);
                        self.metrics.record_toast();
                    }
                }
            }
        }
        self.metrics.record_processed();
    }

    fn decode_change(&self, user: &UserId, event: RawEvent) -> Option<CacheChange> {
        if event.event_type == EventType::Delete {
            let id = event
                .old
                .as_ref()
                .or(event.new.as_ref())
                .and_then(decode_row_id);
            if id.is_none() {
                warn!("Delete event without a row id");
                self.metrics.record_decode_failure();
            }
            return id.map(CacheChange::Deleted);
        }

        let Some(row) = event.new.as_ref() else {
            warn!(event_type = ?event.event_type, "Change event without a row");
            self.metrics.record_decode_failure();
            return None;
        };
        let decoded = match decode_notification(row) {
            Ok(decoded) => decoded,
            Err(e) => {
                warn!(error = %e, "Dropping undecodable notification row");
                self.metrics.record_decode_failure();
                return None;
            }
        };

        if !decoded.fallbacks.is_empty() {
            warn!(
                notification_id = %decoded.notification.id,
                fields = ?decoded.fallbacks,
                "Notification fields fell back to defaults"
            );
            self.metrics.record_fallbacks(decoded.fallbacks.len());
        }
        if &decoded.notification.user_id != user {
            debug!(notification_id = %decoded.notification.id, "Ignoring notification for another user");
            self.metrics.record_ignored();
            return None;
        }

        Some(match event.event_type {
            EventType::Insert => CacheChange::Inserted(decoded.notification),
            _ => CacheChange::Updated(decoded.notification),
        })
    }

    /// The channel dropped: mark stale, then refetch and resubscribe with backoff
    async fn recover(
        &self,
        user: &UserId,
        cause: ChannelError,
    ) -> Option<mpsc::UnboundedReceiver<ChannelMessage>> {
        self.state
            .lock()
            .await
            .session
            .handle(&SessionEvent::ChannelDropped {
                reason: cause.to_string(),
            });
        let stale = lock(&self.subscription).take();
        if let Some(id) = stale {
            self.transport.unsubscribe(&id).await;
        }

        for attempt in 1..=self.settings.resubscribe_attempts {
            match self.connect(user).await {
                Ok(events) => {
                    self.metrics.record_resubscribe();
                    self.state.lock().await.session.handle(&SessionEvent::Live);
                    info!(attempt, "Notification channel resubscribed");
                    return Some(events);
                }
                Err(e) => {
                    warn!(attempt, error = %e, "Notification resubscribe failed");
                    if attempt < self.settings.resubscribe_attempts {
                        tokio::time::sleep(self.settings.resubscribe_backoff()).await;
                    }
                }
            }
        }

        error!(
            attempts = self.settings.resubscribe_attempts,
            cause = %cause,
            "Giving up on notification channel, cache may be out of date"
        );
        self.toasts.notify(
            "Live notifications unavailable, showing cached results",
            ToastKind::Warning,
        );
        self.metrics.record_toast();
        None
    }
}

/// Single consumer for one subscription; processes each event to completion
async fn run_events(
    inner: Arc<Inner>,
    user: UserId,
    mut events: mpsc::UnboundedReceiver<ChannelMessage>,
) {
    loop {
        let reason = loop {
            match events.recv().await {
                Some(ChannelMessage::Event(event)) => inner.handle_event(&user, event).await,
                Some(ChannelMessage::Closed { reason }) => break reason,
                None => break "event stream ended".to_string(),
            }
        };

        match inner.recover(&user, ChannelError::Dropped { reason }).await {
            Some(next) => events = next,
            None => return,
        }
    }
}

fn lock<T>(mutex: &StdMutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
