// Session state machine
//
// Tracks the session lifecycle over Unauthenticated, Authenticating,
// Authenticated and Expiring. Transitions are validated here; side effects
// (credential installation, storage writes) belong to the session manager.

pub mod errors;
pub mod events;
pub mod session_state_machine;
pub mod states;

pub use errors::{StateMachineError, StateMachineResult};
pub use events::{LogoutReason, SessionEvent};
pub use session_state_machine::SessionStateMachine;
pub use states::SessionState;
