// Test Helpers Module - deterministic doubles for unit and integration tests
//
// A manual wall clock, a transport that answers from per-route scripts, and a
// job backend with scripted submissions and status replies.

pub mod backend;
pub mod clock;
pub mod transport;

pub use backend::{ScriptedBackend, ScriptedReply};
pub use clock::ManualClock;
pub use transport::ScriptedTransport;
