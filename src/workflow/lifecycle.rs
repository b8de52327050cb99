// Memo lifecycle transitions
//
// draft --submit--> pending --decide--> approved | rejected
//
// pending --submit--> pending is a resubmission and resets the approval record.
// Deciding an already decided memo is allowed and the last decision wins.

use thiserror::Error;
use tracing::info;

use crate::errors::CoreError;
use crate::records::MemoStatus;

use super::types::ApprovalAction;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// Keep editing a draft
    Save,
    /// Send for review (or send again)
    Submit,
    /// Reviewer decision
    Decide(ApprovalAction),
}

impl LifecycleEvent {
    /// Event implied by a status written through a plain memo update
    pub fn from_requested_status(status: MemoStatus) -> Result<Self, TransitionError> {
        match status {
            MemoStatus::Draft => Ok(LifecycleEvent::Save),
            MemoStatus::Pending => Ok(LifecycleEvent::Submit),
            MemoStatus::Approved | MemoStatus::Rejected => {
                Err(TransitionError::RequiresDecision { to: status })
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionKind {
    Saved,
    Submitted,
    Resubmitted,
    Decided,
    Redecided,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: MemoStatus,
    pub to: MemoStatus,
    pub kind: TransitionKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("memo cannot move from {from} to {to}")]
    Invalid { from: MemoStatus, to: MemoStatus },

    #[error("{to} can only be set by an approval decision")]
    RequiresDecision { to: MemoStatus },
}

impl From<TransitionError> for CoreError {
    fn from(err: TransitionError) -> Self {
        match err {
            TransitionError::Invalid { from, to } => CoreError::InvalidTransition { from, to },
            TransitionError::RequiresDecision { .. } => CoreError::validation(err.to_string()),
        }
    }
}

/// Resolve the next status for `event`, or reject the move
pub fn transition(from: MemoStatus, event: LifecycleEvent) -> Result<Transition, TransitionError> {
    let (to, kind) = match (from, event) {
        (MemoStatus::Draft, LifecycleEvent::Save) => (MemoStatus::Draft, TransitionKind::Saved),
        (MemoStatus::Draft, LifecycleEvent::Submit) => {
            (MemoStatus::Pending, TransitionKind::Submitted)
        }
        (MemoStatus::Pending, LifecycleEvent::Submit) => {
            (MemoStatus::Pending, TransitionKind::Resubmitted)
        }
        (MemoStatus::Pending, LifecycleEvent::Decide(action)) => {
            (action.as_memo_status(), TransitionKind::Decided)
        }
        (MemoStatus::Approved | MemoStatus::Rejected, LifecycleEvent::Decide(action)) => {
            (action.as_memo_status(), TransitionKind::Redecided)
        }
        (from, event) => {
            let to = match event {
                LifecycleEvent::Save => MemoStatus::Draft,
                LifecycleEvent::Submit => MemoStatus::Pending,
                LifecycleEvent::Decide(action) => action.as_memo_status(),
            };
            return Err(TransitionError::Invalid { from, to });
        }
    };

    let transition = Transition { from, to, kind };
    info!(
        from = %transition.from,
        to = %transition.to,
        kind = ?transition.kind,
        "Memo lifecycle transition"
    );
    Ok(transition)
}
