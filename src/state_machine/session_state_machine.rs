use chrono::{DateTime, Utc};

use super::errors::{StateMachineError, StateMachineResult};
use super::events::SessionEvent;
use super::states::SessionState;

/// Session lifecycle state machine
///
/// Pure bookkeeping: it owns no credential and performs no I/O. The session
/// manager drives it and acts on the resulting state.
#[derive(Debug, Clone)]
pub struct SessionStateMachine {
    current: SessionState,
    last_event: Option<SessionEvent>,
    transitioned_at: Option<DateTime<Utc>>,
}

impl Default for SessionStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStateMachine {
    pub fn new() -> Self {
        Self {
            current: SessionState::Unauthenticated,
            last_event: None,
            transitioned_at: None,
        }
    }

    pub fn current_state(&self) -> SessionState {
        self.current
    }

    pub fn last_event(&self) -> Option<SessionEvent> {
        self.last_event
    }

    pub fn transitioned_at(&self) -> Option<DateTime<Utc>> {
        self.transitioned_at
    }

    /// Attempt to apply an event, returning the new state
    pub fn transition(
        &mut self,
        event: SessionEvent,
        now: DateTime<Utc>,
    ) -> StateMachineResult<SessionState> {
        let target = Self::determine_target_state(self.current, &event)?;
        self.current = target;
        self.last_event = Some(event);
        self.transitioned_at = Some(now);
        Ok(target)
    }

    /// Determine the target state based on current state and event
    pub fn determine_target_state(
        current_state: SessionState,
        event: &SessionEvent,
    ) -> StateMachineResult<SessionState> {
        let target = match (current_state, event) {
            // Any renewal trigger (startup, proactive, reactive 401, login)
            (_, SessionEvent::AuthenticationStarted) => SessionState::Authenticating,

            (SessionState::Authenticating, SessionEvent::AuthenticationSucceeded) => {
                SessionState::Authenticated
            }
            (SessionState::Authenticating, SessionEvent::AuthenticationFailed) => {
                SessionState::Unauthenticated
            }

            (SessionState::Authenticated, SessionEvent::ExpiryApproaching) => {
                SessionState::Expiring
            }
            (SessionState::Expiring, SessionEvent::ExpiryApproaching) => SessionState::Expiring,

            // Inactivity and explicit logout end the session from anywhere
            (_, SessionEvent::Terminated(_)) => SessionState::Unauthenticated,

            (from_state, event) => {
                return Err(StateMachineError::InvalidTransition {
                    from: from_state.to_string(),
                    event: event.event_type().to_string(),
                })
            }
        };

        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_machine::events::LogoutReason;

    #[test]
    fn test_renewal_cycle() {
        let mut sm = SessionStateMachine::new();
        let now = Utc::now();

        assert_eq!(
            sm.transition(SessionEvent::AuthenticationStarted, now).unwrap(),
            SessionState::Authenticating
        );
        assert_eq!(
            sm.transition(SessionEvent::AuthenticationSucceeded, now).unwrap(),
            SessionState::Authenticated
        );
        assert_eq!(
            sm.transition(SessionEvent::ExpiryApproaching, now).unwrap(),
            SessionState::Expiring
        );
        assert_eq!(
            sm.transition(SessionEvent::AuthenticationStarted, now).unwrap(),
            SessionState::Authenticating
        );
        assert_eq!(
            sm.transition(SessionEvent::AuthenticationFailed, now).unwrap(),
            SessionState::Unauthenticated
        );
        assert_eq!(sm.last_event(), Some(SessionEvent::AuthenticationFailed));
        assert_eq!(sm.transitioned_at(), Some(now));
    }

    #[test]
    fn test_termination_from_every_state() {
        for state in [
            SessionState::Unauthenticated,
            SessionState::Authenticating,
            SessionState::Authenticated,
            SessionState::Expiring,
        ] {
            let target = SessionStateMachine::determine_target_state(
                state,
                &SessionEvent::Terminated(LogoutReason::Inactivity),
            )
            .unwrap();
            assert_eq!(target, SessionState::Unauthenticated);
        }
    }

    #[test]
    fn test_invalid_transitions() {
        assert!(SessionStateMachine::determine_target_state(
            SessionState::Unauthenticated,
            &SessionEvent::AuthenticationSucceeded
        )
        .is_err());
        assert!(SessionStateMachine::determine_target_state(
            SessionState::Unauthenticated,
            &SessionEvent::ExpiryApproaching
        )
        .is_err());
        assert!(SessionStateMachine::determine_target_state(
            SessionState::Authenticated,
            &SessionEvent::AuthenticationFailed
        )
        .is_err());
    }

    #[test]
    fn test_failed_transition_keeps_state() {
        let mut sm = SessionStateMachine::new();
        assert!(sm
            .transition(SessionEvent::AuthenticationSucceeded, Utc::now())
            .is_err());
        assert_eq!(sm.current_state(), SessionState::Unauthenticated);
        assert!(sm.last_event().is_none());
    }
}
