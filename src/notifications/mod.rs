// Notification Sync - per-user notification cache fed by fetch + change feed

pub mod cache;
pub mod decode;
pub mod engine;
pub mod session;


pub use cache::{CacheChange, NotificationCache, SyncEffect};
pub use decode::{decode_notification, decode_row_id, DecodeError, Decoded};
pub use engine::NotificationSyncEngine;
pub use session::{SessionEvent, SessionPhase, SyncSession};
