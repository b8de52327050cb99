// Channel Transport - push-based change feed consumed by the notification engine

pub mod local;
pub mod traits;
pub mod types;

pub use local::LocalChannel;
pub use traits::ChannelTransport;
#[cfg(any(test, feature = "testing"))]
pub use traits::MockChannelTransport;
pub use types::{
    ChannelError, ChannelMessage, EventType, RawEvent, Subscription, SubscriptionFilter,
    SubscriptionId,
};
