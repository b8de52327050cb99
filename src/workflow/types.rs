// Inputs and read models for the approval workflow

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::records::{ApprovalRecord, ApprovalStatus, Memo, MemoStatus};

/// Fields accepted when creating a memo
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateMemoInput {
    pub title: String,
    pub content: String,
    pub department: Option<String>,
    /// `draft` when absent; only `draft` and `pending` are accepted
    pub status: Option<MemoStatus>,
}

impl CreateMemoInput {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn with_department(mut self, department: impl Into<String>) -> Self {
        self.department = Some(department.into());
        self
    }

    pub fn with_status(mut self, status: MemoStatus) -> Self {
        self.status = Some(status);
        self
    }
}

/// A reviewer's decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalAction {
    Approved,
    Rejected,
}

impl ApprovalAction {
    pub fn as_memo_status(&self) -> MemoStatus {
        match self {
            ApprovalAction::Approved => MemoStatus::Approved,
            ApprovalAction::Rejected => MemoStatus::Rejected,
        }
    }

    pub fn as_approval_status(&self) -> ApprovalStatus {
        match self {
            ApprovalAction::Approved => ApprovalStatus::Approved,
            ApprovalAction::Rejected => ApprovalStatus::Rejected,
        }
    }
}

impl fmt::Display for ApprovalAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_memo_status().as_str())
    }
}

/// How the approval trail relates to the memo status. The memo status is
/// authoritative; anything but `Consistent` means the trail lags or a
/// dual write was interrupted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalConsistency {
    Consistent,
    /// A pending or decided memo has no approval record
    MissingApproval,
    /// The current approval record holds a different status
    ApprovalDisagrees { approval: ApprovalStatus },
    /// A draft memo still has an undecided approval record
    UnexpectedApproval,
}

impl ApprovalConsistency {
    pub fn assess(status: MemoStatus, approval: Option<&ApprovalRecord>) -> Self {
        match (status, approval) {
            (MemoStatus::Draft, None) => ApprovalConsistency::Consistent,
            (MemoStatus::Draft, Some(record)) if record.status.is_terminal() => {
                ApprovalConsistency::Consistent
            }
            (MemoStatus::Draft, Some(_)) => ApprovalConsistency::UnexpectedApproval,
            (_, None) => ApprovalConsistency::MissingApproval,
            (status, Some(record)) if record.status.as_memo_status() == status => {
                ApprovalConsistency::Consistent
            }
            (_, Some(record)) => ApprovalConsistency::ApprovalDisagrees {
                approval: record.status,
            },
        }
    }
}

/// Memo joined with its current approval record
#[derive(Debug, Clone, PartialEq)]
pub struct MemoWithApproval {
    pub memo: Memo,
    pub approval: Option<ApprovalRecord>,
    pub consistency: ApprovalConsistency,
}

/// The record with the latest `approval_date` is current; undecided records
/// rank lowest and later entries win ties.
pub fn current_approval(records: Vec<ApprovalRecord>) -> Option<ApprovalRecord> {
    records.into_iter().max_by_key(|record| record.approval_date)
}
