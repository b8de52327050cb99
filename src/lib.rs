// Memoflow Library - memo approval workflow and live notification sync
// This exposes the core components for embedding and integration testing

pub mod auth;
pub mod channel;
pub mod config;
pub mod errors;
pub mod notifications;
pub mod observability;
pub mod records;
pub mod telemetry;
pub mod toast;
pub mod workflow;

// Re-export key types for easy access
pub use auth::{ActorProvider, StaticActor};
pub use channel::{ChannelTransport, LocalChannel, RawEvent, SubscriptionFilter};
pub use config::{config, init_config, MemoflowConfig, NotificationSettings, WorkflowSettings};
pub use errors::{CoreError, CoreResult, ErrorKind};
pub use notifications::{NotificationCache, NotificationSyncEngine, SessionPhase};
pub use observability::{OperationTimer, SyncMetrics, SyncStats};
pub use records::{
    ApprovalRecord, ApprovalStatus, ApprovalStore, InMemoryStore, Memo, MemoId, MemoPatch,
    MemoStatus, MemoStore, Notification, NotificationId, NotificationStore, StoreError, UserId,
};
pub use telemetry::{generate_correlation_id, init_telemetry};
pub use toast::{RecordingToastSink, ToastKind, ToastSink, TracingToastSink};
pub use workflow::{
    ApprovalAction, ApprovalConsistency, ApprovalWorkflowEngine, CreateMemoInput,
    MemoWithApproval,
};
