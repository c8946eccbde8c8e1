use chrono::{DateTime, Utc};
use std::fmt;

/// Wall-clock source for credential expiry and inactivity decisions
///
/// Timer cadence uses tokio time; instants that are persisted or compared
/// against server-issued expiries come from here.
pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
