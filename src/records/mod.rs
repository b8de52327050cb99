// Record Store - data model and per-collection storage contracts

pub mod memory;
pub mod traits;
pub mod types;

pub use memory::{InMemoryStore, StoreOp};
pub use traits::{ApprovalStore, MemoStore, NotificationStore, StoreError};
#[cfg(any(test, feature = "testing"))]
pub use traits::{MockApprovalStore, MockMemoStore, MockNotificationStore};
pub use types::*;
