// Approval workflow engine - owns the memo lifecycle and the memo/approval pair
//
// Writes are pessimistic: nothing cached is touched before the store accepts
// the write. The memo row and its approval record are written separately with
// no transaction, so the memo status is authoritative and the approval record
// is an audit trail that may lag (see `memo_with_approval`).

use chrono::Utc;
use moka::future::Cache;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn, Instrument};

use crate::auth::ActorProvider;
use crate::config::WorkflowSettings;
use crate::errors::{CoreError, CoreResult};
use crate::observability::OperationTimer;
use crate::records::*;
use crate::telemetry::{create_workflow_span, generate_correlation_id};
use crate::toast::{ToastKind, ToastSink};

use super::lifecycle::{transition, LifecycleEvent, TransitionKind};
use super::types::*;

pub struct ApprovalWorkflowEngine {
    memos: Arc<dyn MemoStore>,
    approvals: Arc<dyn ApprovalStore>,
    actors: Arc<dyn ActorProvider>,
    toasts: Arc<dyn ToastSink>,
    // producer for decision notifications, when enabled
    author_notifications: Option<Arc<dyn NotificationStore>>,
    settings: WorkflowSettings,
    memo_views: Cache<UserId, Arc<Vec<Memo>>>,
    // bumped on every invalidation; a read that straddles one is not cached
    view_generation: AtomicU64,
}

impl ApprovalWorkflowEngine {
    pub fn new(
        memos: Arc<dyn MemoStore>,
        approvals: Arc<dyn ApprovalStore>,
        actors: Arc<dyn ActorProvider>,
        toasts: Arc<dyn ToastSink>,
        settings: WorkflowSettings,
    ) -> Self {
        let memo_views = Cache::builder()
            .max_capacity(settings.memo_view_capacity)
            .time_to_live(Duration::from_secs(settings.memo_view_ttl_seconds))
            .build();

        Self {
            memos,
            approvals,
            actors,
            toasts,
            author_notifications: None,
            settings,
            memo_views,
            view_generation: AtomicU64::new(0),
        }
    }

    /// Attach the store used to notify memo authors of decisions
    pub fn with_notification_store(mut self, store: Arc<dyn NotificationStore>) -> Self {
        self.author_notifications = Some(store);
        self
    }

    /// Create a memo as `draft` (default) or directly `pending`.
    /// A pending memo also gets an undecided approval record.
    pub async fn create_memo(&self, input: CreateMemoInput) -> CoreResult<Memo> {
        let actor = self.actors.current_actor();
        let span = create_workflow_span(
            "create_memo",
            None,
            actor.as_ref().map(UserId::as_str),
            &generate_correlation_id(),
        );
        let timer = OperationTimer::new("create_memo");
        let result = self.create_memo_inner(actor, input).instrument(span).await;
        timer.finish(result.is_ok());
        self.report(&result, |memo| format!("Memo \"{}\" saved", memo.title));
        result
    }

    async fn create_memo_inner(&self, actor: Option<UserId>, input: CreateMemoInput) -> CoreResult<Memo> {
        let actor = actor.ok_or(CoreError::Authentication {
            operation: "create_memo",
        })?;

        let title = required("Title", &input.title)?;
        let content = required("Content", &input.content)?;
        let requested = input.status.unwrap_or(MemoStatus::Draft);
        let lifecycle = transition(MemoStatus::Draft, LifecycleEvent::from_requested_status(requested)?)?;

        let memo = self
            .memos
            .insert_memo(NewMemo {
                title,
                content,
                department: normalize(input.department),
                status: lifecycle.to,
                created_by: actor.clone(),
            })
            .await?;
        self.invalidate_view(&actor).await;
        info!(memo_id = %memo.id, status = %memo.status, "Memo created");

        if memo.status == MemoStatus::Pending {
            if let Err(e) = self
                .approvals
                .upsert_approval(ApprovalUpsert::pending(memo.id.clone()))
                .await
            {
                warn!(memo_id = %memo.id, error = %e, "Pending memo stored without approval record");
                return Err(e.into());
            }
        }

        Ok(memo)
    }

    /// Apply field updates. Setting `status: pending` submits (or resubmits) the
    /// memo and resets its approval record to undecided.
    pub async fn update_memo(&self, id: &MemoId, patch: MemoPatch) -> CoreResult<Memo> {
        let actor = self.actors.current_actor();
        let span = create_workflow_span(
            "update_memo",
            Some(id.as_str()),
            actor.as_ref().map(UserId::as_str),
            &generate_correlation_id(),
        );
        let timer = OperationTimer::new("update_memo");
        let result = self.update_memo_inner(id, patch).instrument(span).await;
        timer.finish(result.is_ok());
        self.report(&result, |memo| match memo.status {
            MemoStatus::Pending => format!("Memo \"{}\" submitted for approval", memo.title),
            _ => format!("Memo \"{}\" updated", memo.title),
        });
        result
    }

    async fn update_memo_inner(&self, id: &MemoId, mut patch: MemoPatch) -> CoreResult<Memo> {
        if let Some(title) = &patch.title {
            patch.title = Some(required("Title", title)?);
        }
        if let Some(department) = patch.department.take() {
            patch.department = Some(normalize(department));
        }

        let lifecycle = match patch.status {
            Some(requested) => {
                let event = LifecycleEvent::from_requested_status(requested)?;
                let current = self.load_memo(id).await?;
                Some(transition(current.status, event)?)
            }
            None => None,
        };

        if patch.is_empty() {
            debug!(memo_id = %id, "Empty memo patch");
            return self.load_memo(id).await;
        }

        let memo = self.memos.update_memo(id, &patch).await?;
        self.invalidate_view(&memo.created_by).await;

        if memo.status == MemoStatus::Pending && patch.status.is_some() {
            if matches!(lifecycle.map(|t| t.kind), Some(TransitionKind::Resubmitted)) {
                warn!(memo_id = %id, "Resubmission resets any prior approval decision");
            }
            self.approvals
                .upsert_approval(ApprovalUpsert::pending(id.clone()))
                .await
                .inspect_err(|e| {
                    warn!(memo_id = %id, error = %e, "Memo submitted but approval record not reset");
                })?;
        }

        Ok(memo)
    }

    /// Record a reviewer decision. Two writes: the approval record, then the
    /// memo status. Deciding an already decided memo overwrites the decision.
    pub async fn process_approval(
        &self,
        memo_id: &MemoId,
        action: ApprovalAction,
        comments: Option<String>,
    ) -> CoreResult<Memo> {
        let actor = self.actors.current_actor();
        let span = create_workflow_span(
            "process_approval",
            Some(memo_id.as_str()),
            actor.as_ref().map(UserId::as_str),
            &generate_correlation_id(),
        );
        let timer = OperationTimer::new("process_approval");
        let result = self
            .process_approval_inner(actor, memo_id, action, comments)
            .instrument(span)
            .await;
        timer.finish(result.is_ok());
        self.report(&result, |memo| format!("Memo \"{}\" {}", memo.title, action));
        result
    }

    async fn process_approval_inner(
        &self,
        actor: Option<UserId>,
        memo_id: &MemoId,
        action: ApprovalAction,
        comments: Option<String>,
    ) -> CoreResult<Memo> {
        let approver = actor.ok_or(CoreError::Authentication {
            operation: "process_approval",
        })?;

        let current = self.load_memo(memo_id).await?;
        let lifecycle = transition(current.status, LifecycleEvent::Decide(action))?;
        if lifecycle.kind == TransitionKind::Redecided {
            warn!(
                memo_id = %memo_id,
                previous = %current.status,
                "Overwriting an earlier decision"
            );
        }

        let comments = normalize(comments);
        self.approvals
            .upsert_approval(ApprovalUpsert {
                memo_id: memo_id.clone(),
                approver_id: Some(approver.clone()),
                status: action.as_approval_status(),
                approval_date: Some(Utc::now()),
                comments: comments.clone(),
            })
            .await?;

        let memo = match self
            .memos
            .update_memo(memo_id, &MemoPatch::status(lifecycle.to))
            .await
        {
            Ok(memo) => memo,
            Err(e) => {
                error!(
                    memo_id = %memo_id,
                    error = %e,
                    "Approval recorded but memo status not updated"
                );
                return Err(e.into());
            }
        };
        self.invalidate_view(&memo.created_by).await;
        info!(memo_id = %memo_id, approver = %approver, status = %memo.status, "Approval processed");

        self.notify_author(&memo, action, comments.as_deref()).await;
        Ok(memo)
    }

    /// Delete approval records first, then the memo. Retrying after a partial
    /// failure is safe.
    pub async fn delete_memo(&self, id: &MemoId) -> CoreResult<()> {
        let actor = self.actors.current_actor();
        let span = create_workflow_span(
            "delete_memo",
            Some(id.as_str()),
            actor.as_ref().map(UserId::as_str),
            &generate_correlation_id(),
        );
        let timer = OperationTimer::new("delete_memo");
        let result = self.delete_memo_inner(id).instrument(span).await;
        timer.finish(result.is_ok());
        self.report(&result, |_| "Memo deleted".to_string());
        result
    }

    async fn delete_memo_inner(&self, id: &MemoId) -> CoreResult<()> {
        let removed = self.approvals.delete_approvals_for_memo(id).await?;
        debug!(memo_id = %id, removed, "Approval records deleted");

        match self.memos.delete_memo(id).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => debug!(memo_id = %id, "Memo already deleted"),
            Err(e) => {
                warn!(memo_id = %id, error = %e, "Approval records deleted but memo remains");
                return Err(e.into());
            }
        }

        // author is not re-read before deletion
        self.view_generation.fetch_add(1, Ordering::SeqCst);
        self.memo_views.invalidate_all();
        info!(memo_id = %id, "Memo deleted");
        Ok(())
    }

    /// Reconciliation read: the memo, its current approval record and whether
    /// the two agree. `None` when the memo does not exist.
    pub async fn memo_with_approval(&self, id: &MemoId) -> CoreResult<Option<MemoWithApproval>> {
        let Some(memo) = self.memos.get_memo(id).await? else {
            return Ok(None);
        };
        let approval = current_approval(self.approvals.approvals_for_memo(id).await?);
        let consistency = ApprovalConsistency::assess(memo.status, approval.as_ref());
        if consistency != ApprovalConsistency::Consistent {
            warn!(memo_id = %id, status = %memo.status, ?consistency, "Approval trail out of step with memo");
        }

        Ok(Some(MemoWithApproval {
            memo,
            approval,
            consistency,
        }))
    }

    /// Memos authored by the signed-in user, newest first. Served from a
    /// short-lived cache that every mutation invalidates.
    pub async fn memos_for_current_user(&self) -> CoreResult<Arc<Vec<Memo>>> {
        let actor = self.actors.current_actor().ok_or(CoreError::Authentication {
            operation: "memos_for_current_user",
        })?;

        if let Some(cached) = self.memo_views.get(&actor).await {
            debug!(user = %actor, "Memo view cache hit");
            return Ok(cached);
        }

        let generation = self.view_generation.load(Ordering::SeqCst);
        let memos = Arc::new(self.memos.memos_by_author(&actor).await?);
        if self.view_generation.load(Ordering::SeqCst) == generation {
            self.memo_views.insert(actor.clone(), memos.clone()).await;
            // an invalidation may land between the check and the insert
            if self.view_generation.load(Ordering::SeqCst) != generation {
                self.memo_views.invalidate(&actor).await;
            }
        } else {
            debug!(user = %actor, "Memo view changed during read, not caching");
        }
        Ok(memos)
    }

    async fn invalidate_view(&self, author: &UserId) {
        self.view_generation.fetch_add(1, Ordering::SeqCst);
        self.memo_views.invalidate(author).await;
    }

    async fn load_memo(&self, id: &MemoId) -> CoreResult<Memo> {
        self.memos.get_memo(id).await?.ok_or_else(|| {
            CoreError::Persistence(StoreError::NotFound {
                collection: collections::MEMOS,
                id: id.to_string(),
            })
        })
    }

    async fn notify_author(&self, memo: &Memo, action: ApprovalAction, comments: Option<&str>) {
        if !self.settings.notify_author_on_decision {
            return;
        }
        let Some(store) = &self.author_notifications else {
            return;
        };

        let (title, kind) = match action {
            ApprovalAction::Approved => ("Memo approved", NotificationType::Success),
            ApprovalAction::Rejected => ("Memo rejected", NotificationType::Error),
        };
        let message = match comments {
            Some(comments) => format!("\"{}\" was {}: {}", memo.title, action, comments),
            None => format!("\"{}\" was {}", memo.title, action),
        };

        let notification = NewNotification {
            user_id: memo.created_by.clone(),
            title: title.to_string(),
            message,
            kind,
            category: NotificationCategory::Memo,
            priority: NotificationPriority::Normal,
            action_url: Some(format!("/memos/{}", memo.id)),
        };
        if let Err(e) = store.insert_notification(notification).await {
            warn!(memo_id = %memo.id, error = %e, "Failed to notify memo author");
        }
    }

    fn report<T>(&self, result: &CoreResult<T>, success: impl FnOnce(&T) -> String) {
        match result {
            Ok(value) => self.toasts.notify(&success(value), ToastKind::Success),
            Err(e) => {
                warn!(kind = ?e.kind(), error = %e, "Workflow operation failed");
                self.toasts.notify(&e.user_message(), ToastKind::Error);
            }
        }
    }
}

fn required(field: &str, value: &str) -> CoreResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CoreError::validation(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

fn normalize(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
