use thiserror::Error;

use crate::channel::ChannelError;
use crate::records::{MemoStatus, StoreError};

/// Errors returned by the workflow and notification engines
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    #[error("no authenticated actor for {operation}")]
    Authentication { operation: &'static str },

    #[error("validation failed: {reason}")]
    Validation { reason: String },

    #[error("memo cannot move from {from} to {to}")]
    InvalidTransition { from: MemoStatus, to: MemoStatus },

    #[error("record store error: {0}")]
    Persistence(#[from] StoreError),

    #[error("channel error: {0}")]
    Channel(#[from] ChannelError),
}

/// Coarse error classification, preserved for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Authentication,
    Validation,
    InvalidTransition,
    Persistence,
    Channel,
}

impl CoreError {
    pub fn validation(reason: impl Into<String>) -> Self {
        CoreError::Validation {
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::Authentication { .. } => ErrorKind::Authentication,
            CoreError::Validation { .. } => ErrorKind::Validation,
            CoreError::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            CoreError::Persistence(_) => ErrorKind::Persistence,
            CoreError::Channel(_) => ErrorKind::Channel,
        }
    }

    /// Persistence and channel failures may succeed on a later attempt
    pub fn is_retryable(&self) -> bool {
        matches!(self, CoreError::Persistence(_) | CoreError::Channel(_))
    }

    /// Short message suitable for a toast
    pub fn user_message(&self) -> String {
        match self {
            CoreError::Authentication { .. } => "Please sign in to continue".to_string(),
            CoreError::Validation { reason } => reason.clone(),
            CoreError::InvalidTransition { from, to } => {
                format!("A {from} memo cannot be marked {to}")
            }
            CoreError::Persistence(StoreError::NotFound { .. }) => {
                "The record no longer exists".to_string()
            }
            CoreError::Persistence(_) => "Could not save changes, please try again".to_string(),
            CoreError::Channel(_) => "Live updates interrupted, refreshing".to_string(),
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_errors_are_retryable_persistence() {
        let err: CoreError = StoreError::backend("memos", "insert", "timeout").into();
        assert_eq!(err.kind(), ErrorKind::Persistence);
        assert!(err.is_retryable());
    }

    #[test]
    fn test_caller_errors_are_not_retryable() {
        let err = CoreError::Authentication {
            operation: "create_memo",
        };
        assert!(!err.is_retryable());
        assert_eq!(err.user_message(), "Please sign in to continue");

        let err = CoreError::InvalidTransition {
            from: MemoStatus::Draft,
            to: MemoStatus::Approved,
        };
        assert_eq!(err.to_string(), "memo cannot move from draft to approved");
    }
}
