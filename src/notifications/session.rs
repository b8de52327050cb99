// Notification sync session lifecycle
//
// idle --start--> connecting --live--> live --dropped--> stale --live--> live
// Any state returns to idle on stop.

use statig::prelude::*;

use crate::records::UserId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Start { user_id: UserId },
    /// Initial fetch done and subscription open
    Live,
    ChannelDropped { reason: String },
    Stop,
}

/// Externally visible session phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Connecting,
    Live,
    Stale,
}

#[derive(Debug, Default)]
pub struct SyncSession {
    pub user_id: Option<UserId>,
    pub drops: u32,
    pub last_drop_reason: Option<String>,
}

#[state_machine(initial = "State::idle()")]
impl SyncSession {
    #[state]
    fn idle(&mut self, event: &SessionEvent) -> Outcome<State> {
        match event {
            SessionEvent::Start { user_id } => {
                self.user_id = Some(user_id.clone());
                self.drops = 0;
                self.last_drop_reason = None;
                tracing::info!(user_id = %user_id, "Notification session starting");
                Transition(State::connecting())
            }
            _ => Handled,
        }
    }

    #[state]
    fn connecting(&mut self, event: &SessionEvent) -> Outcome<State> {
        match event {
            SessionEvent::Live => {
                tracing::info!(user_id = ?self.user_id, "Notification session live");
                Transition(State::live())
            }
            SessionEvent::Stop => {
                self.reset();
                Transition(State::idle())
            }
            _ => Handled,
        }
    }

    #[state]
    fn live(&mut self, event: &SessionEvent) -> Outcome<State> {
        match event {
            SessionEvent::ChannelDropped { reason } => {
                self.drops += 1;
                self.last_drop_reason = Some(reason.clone());
                tracing::warn!(
                    user_id = ?self.user_id,
                    reason = %reason,
                    drops = self.drops,
                    "Notification channel dropped, cache may be stale"
                );
                Transition(State::stale())
            }
            SessionEvent::Stop => {
                self.reset();
                Transition(State::idle())
            }
            _ => Handled,
        }
    }

    #[state]
    fn stale(&mut self, event: &SessionEvent) -> Outcome<State> {
        match event {
            SessionEvent::Live => {
                tracing::info!(user_id = ?self.user_id, "Notification session recovered");
                Transition(State::live())
            }
            SessionEvent::Stop => {
                self.reset();
                Transition(State::idle())
            }
            _ => Handled,
        }
    }
}

impl SyncSession {
    fn reset(&mut self) {
        tracing::info!(user_id = ?self.user_id, "Notification session stopped");
        self.user_id = None;
    }
}

/// Phase of a running session machine
pub fn phase(machine: &StateMachine<SyncSession>) -> SessionPhase {
    match machine.state() {
        State::Idle { .. } => SessionPhase::Idle,
        State::Connecting { .. } => SessionPhase::Connecting,
        State::Live { .. } => SessionPhase::Live,
        State::Stale { .. } => SessionPhase::Stale,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_lifecycle() {
        let mut sm = SyncSession::default().state_machine();
        assert_eq!(phase(&sm), SessionPhase::Idle);

        sm.handle(&SessionEvent::Start {
            user_id: UserId::from("alice"),
        });
        assert_eq!(phase(&sm), SessionPhase::Connecting);

        sm.handle(&SessionEvent::Live);
        assert_eq!(phase(&sm), SessionPhase::Live);

        sm.handle(&SessionEvent::ChannelDropped {
            reason: "network".to_string(),
        });
        assert_eq!(phase(&sm), SessionPhase::Stale);
        assert_eq!(sm.inner().drops, 1);

        sm.handle(&SessionEvent::Live);
        assert_eq!(phase(&sm), SessionPhase::Live);

        sm.handle(&SessionEvent::Stop);
        assert_eq!(phase(&sm), SessionPhase::Idle);
        assert_eq!(sm.inner().user_id, None);
    }

    #[test]
    fn test_stop_before_start_is_ignored() {
        let mut sm = SyncSession::default().state_machine();
        sm.handle(&SessionEvent::Stop);
        sm.handle(&SessionEvent::Live);
        assert_eq!(phase(&sm), SessionPhase::Idle);
    }
}
