use async_trait::async_trait;

#[cfg(any(test, feature = "testing"))]
use mockall::automock;

use super::types::{ChannelError, Subscription, SubscriptionFilter, SubscriptionId};

/// Push-based change feed for a named record collection
#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait ChannelTransport: Send + Sync {
    /// Open a subscription; events arrive one at a time in arrival order
    async fn subscribe(
        &self,
        collection: &str,
        filter: SubscriptionFilter,
    ) -> Result<Subscription, ChannelError>;

    /// Cancel a subscription. Unknown ids are ignored.
    async fn unsubscribe(&self, id: &SubscriptionId);
}
