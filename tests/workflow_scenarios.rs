//! End-to-end memo lifecycle scenarios against the in-memory backend
//! Testing library/framework: Rust built-in test framework with Tokio async runtime (#[tokio::test]).

mod fixtures;

use std::sync::Arc;

use fixtures::{Backend, GatedStore};
use memoflow::records::*;
use memoflow::config::WorkflowSettings;
use memoflow::{
    ApprovalAction, ApprovalConsistency, ApprovalWorkflowEngine, CreateMemoInput, ErrorKind,
    RecordingToastSink, StaticActor, ToastKind,
};

async fn draft_memo(backend: &Backend) -> Memo {
    let (author, _) = backend.workflow_as("author");
    author
        .create_memo(CreateMemoInput::new("Q3 Budget", "...").with_status(MemoStatus::Draft))
        .await
        .expect("create draft")
}

async fn submitted_memo(backend: &Backend) -> Memo {
    let memo = draft_memo(backend).await;
    let (author, _) = backend.workflow_as("author");
    author
        .update_memo(&memo.id, MemoPatch::status(MemoStatus::Pending))
        .await
        .expect("submit")
}

#[tokio::test]
async fn draft_memo_has_no_approval_record() {
    let backend = Backend::new();
    let memo = draft_memo(&backend).await;

    assert_eq!(memo.status, MemoStatus::Draft);
    assert_eq!(memo.title, "Q3 Budget");
    assert_eq!(memo.created_by, UserId::from("author"));
    assert!(backend.store.approvals(&memo.id).is_empty());
}

#[tokio::test]
async fn submitting_a_draft_opens_one_pending_approval() {
    let backend = Backend::new();
    let memo = submitted_memo(&backend).await;

    assert_eq!(memo.status, MemoStatus::Pending);
    let approvals = backend.store.approvals(&memo.id);
    assert_eq!(approvals.len(), 1);
    assert_eq!(approvals[0].status, ApprovalStatus::Pending);
    assert_eq!(approvals[0].approval_date, None);
}

#[tokio::test]
async fn approving_a_pending_memo_records_the_decision() {
    let backend = Backend::new();
    let memo = submitted_memo(&backend).await;
    let (reviewer, toasts) = backend.workflow_as("reviewer");

    let decided = reviewer
        .process_approval(&memo.id, ApprovalAction::Approved, Some("Looks good".to_string()))
        .await
        .unwrap();

    assert_eq!(decided.status, MemoStatus::Approved);
    let approvals = backend.store.approvals(&memo.id);
    assert_eq!(approvals.len(), 1);
    assert_eq!(approvals[0].status, ApprovalStatus::Approved);
    assert_eq!(approvals[0].approver_id, Some(UserId::from("reviewer")));
    assert!(approvals[0].approval_date.is_some());
    assert_eq!(approvals[0].comments.as_deref(), Some("Looks good"));
    assert_eq!(toasts.count(ToastKind::Success), 1);

    let view = reviewer.memo_with_approval(&memo.id).await.unwrap().unwrap();
    assert_eq!(view.consistency, ApprovalConsistency::Consistent);
}

#[tokio::test]
async fn memo_created_pending_round_trips_through_reads() {
    let backend = Backend::new();
    let (author, _) = backend.workflow_as("author");

    let memo = author
        .create_memo(
            CreateMemoInput::new("Hiring plan", "Two engineers")
                .with_department("Engineering")
                .with_status(MemoStatus::Pending),
        )
        .await
        .unwrap();

    let view = author.memo_with_approval(&memo.id).await.unwrap().unwrap();
    assert_eq!(view.memo.status, MemoStatus::Pending);
    assert_eq!(view.memo.department.as_deref(), Some("Engineering"));
    assert_eq!(view.approval.map(|a| a.status), Some(ApprovalStatus::Pending));
    assert_eq!(view.consistency, ApprovalConsistency::Consistent);
    assert_eq!(backend.store.approvals(&memo.id).len(), 1);
}

#[tokio::test]
async fn second_decision_overwrites_the_first() {
    let backend = Backend::new();
    let memo = submitted_memo(&backend).await;
    let (reviewer, _) = backend.workflow_as("reviewer");

    reviewer
        .process_approval(&memo.id, ApprovalAction::Approved, None)
        .await
        .unwrap();
    let memo = reviewer
        .process_approval(&memo.id, ApprovalAction::Rejected, Some("Over budget".to_string()))
        .await
        .unwrap();

    assert_eq!(memo.status, MemoStatus::Rejected);
    let approvals = backend.store.approvals(&memo.id);
    assert_eq!(approvals.len(), 1);
    assert_eq!(approvals[0].status, ApprovalStatus::Rejected);
    assert_eq!(approvals[0].comments.as_deref(), Some("Over budget"));
}

#[tokio::test]
async fn status_cannot_skip_or_reverse_the_lifecycle() {
    let backend = Backend::new();
    let draft = draft_memo(&backend).await;
    let (author, toasts) = backend.workflow_as("author");

    let err = author
        .update_memo(&draft.id, MemoPatch::status(MemoStatus::Approved))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let err = author
        .process_approval(&draft.id, ApprovalAction::Approved, None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidTransition);
    assert_eq!(backend.store.memo(&draft.id).unwrap().status, MemoStatus::Draft);

    let approved = submitted_memo(&backend).await;
    author
        .process_approval(&approved.id, ApprovalAction::Approved, None)
        .await
        .unwrap();
    let err = author
        .update_memo(&approved.id, MemoPatch::status(MemoStatus::Pending))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidTransition);
    assert_eq!(toasts.count(ToastKind::Error), 3);
}

#[tokio::test]
async fn deleting_twice_is_harmless() {
    let backend = Backend::new();
    let memo = submitted_memo(&backend).await;
    let (author, _) = backend.workflow_as("author");

    author.delete_memo(&memo.id).await.unwrap();
    author.delete_memo(&memo.id).await.unwrap();

    assert!(backend.store.memo(&memo.id).is_none());
    assert!(backend.store.approvals(&memo.id).is_empty());
    assert!(author.memo_with_approval(&memo.id).await.unwrap().is_none());
    assert!(author.memos_for_current_user().await.unwrap().is_empty());
}

#[tokio::test]
async fn failed_status_write_leaves_a_detectable_disagreement() {
    let backend = Backend::new();
    let memo = submitted_memo(&backend).await;
    let (reviewer, toasts) = backend.workflow_as("reviewer");

    backend.store.fail_next(StoreOp::UpdateMemo);
    let err = reviewer
        .process_approval(&memo.id, ApprovalAction::Approved, None)
        .await
        .unwrap_err();

    assert!(err.is_retryable());
    assert_eq!(toasts.count(ToastKind::Error), 1);
    let view = reviewer.memo_with_approval(&memo.id).await.unwrap().unwrap();
    assert_eq!(view.memo.status, MemoStatus::Pending);
    assert!(matches!(
        view.consistency,
        ApprovalConsistency::ApprovalDisagrees { .. }
    ));

    // retrying converges both records
    reviewer
        .process_approval(&memo.id, ApprovalAction::Approved, None)
        .await
        .unwrap();
    let view = reviewer.memo_with_approval(&memo.id).await.unwrap().unwrap();
    assert_eq!(view.consistency, ApprovalConsistency::Consistent);
}

#[tokio::test]
async fn decision_notifies_the_author() {
    let backend = Backend::new();
    let memo = submitted_memo(&backend).await;
    let (reviewer, _) = backend.workflow_as("reviewer");

    reviewer
        .process_approval(&memo.id, ApprovalAction::Rejected, Some("Needs detail".to_string()))
        .await
        .unwrap();

    let inbox = backend.store.notifications_for(&UserId::from("author"));
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].kind, NotificationType::Error);
    assert_eq!(inbox[0].category, NotificationCategory::Memo);
    assert!(!inbox[0].is_read);
    assert!(inbox[0].message.contains("Needs detail"));
    assert!(backend
        .store
        .notifications_for(&UserId::from("reviewer"))
        .is_empty());
}

#[tokio::test]
async fn author_view_reflects_new_memos() {
    let backend = Backend::new();
    let (author, _) = backend.workflow_as("author");

    assert!(author.memos_for_current_user().await.unwrap().is_empty());
    let memo = author
        .create_memo(CreateMemoInput::new("Offsite", "Agenda"))
        .await
        .unwrap();

    let memos = author.memos_for_current_user().await.unwrap();
    assert_eq!(memos.len(), 1);
    assert_eq!(memos[0].id, memo.id);
}

#[tokio::test]
async fn memo_created_during_a_view_read_is_not_hidden_by_the_cache() {
    let backend = Backend::new();
    let gated = Arc::new(GatedStore::new(backend.store.clone()));
    let author = ApprovalWorkflowEngine::new(
        gated.clone(),
        backend.store.clone(),
        Arc::new(StaticActor::signed_in("author")),
        Arc::new(RecordingToastSink::new()),
        WorkflowSettings::default(),
    );

    gated.gate.arm();
    let read = author.memos_for_current_user();
    let write = async {
        gated.gate.entered.notified().await;
        let memo = author
            .create_memo(CreateMemoInput::new("Offsite", "Agenda"))
            .await
            .unwrap();
        gated.gate.release.notify_one();
        memo
    };
    let (stale, memo) = tokio::join!(read, write);

    // the in-flight read saw the store before the insert
    assert!(stale.unwrap().is_empty());
    let memos = author.memos_for_current_user().await.unwrap();
    assert_eq!(memos.len(), 1);
    assert_eq!(memos[0].id, memo.id);
}
