// Authenticated actor lookup. Sign-in and policy live outside this crate.

use std::sync::RwLock;

#[cfg(any(test, feature = "testing"))]
use mockall::automock;

use crate::records::UserId;

#[cfg_attr(any(test, feature = "testing"), automock)]
pub trait ActorProvider: Send + Sync {
    /// The signed-in user, if any
    fn current_actor(&self) -> Option<UserId>;
}

/// Actor provider holding a settable user, e.g. updated on sign-in/sign-out
#[derive(Debug, Default)]
pub struct StaticActor {
    actor: RwLock<Option<UserId>>,
}

impl StaticActor {
    pub fn signed_in(user: impl Into<UserId>) -> Self {
        Self {
            actor: RwLock::new(Some(user.into())),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn set(&self, actor: Option<UserId>) {
        let mut guard = self.actor.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = actor;
    }
}

impl ActorProvider for StaticActor {
    fn current_actor(&self) -> Option<UserId> {
        self.actor
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}
