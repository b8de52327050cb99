// Approval Workflow - memo lifecycle and the memo/approval record pair

pub mod engine;
pub mod lifecycle;
pub mod types;


pub use engine::ApprovalWorkflowEngine;
pub use lifecycle::{transition, LifecycleEvent, Transition, TransitionError, TransitionKind};
pub use types::{
    current_approval, ApprovalAction, ApprovalConsistency, CreateMemoInput, MemoWithApproval,
};
