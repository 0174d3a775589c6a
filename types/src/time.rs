//! Timestamps and the clock/scheduler contracts.
//!
//! Protocol time is measured in milliseconds. Nothing in the protocol engine
//! blocks or sleeps: every wait is a [`TimerEvent`] handed to a
//! [`Scheduler`], which delivers it back to the owning node later.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::Address;

/// A point in protocol time, in milliseconds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Timestamp {
    /// The epoch (time zero).
    pub const EPOCH: Self = Self(0);

    pub fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    pub fn from_secs(secs: u64) -> Self {
        Self(secs.saturating_mul(1000))
    }

    pub fn as_millis(&self) -> u64 {
        self.0
    }

    /// Time elapsed since this timestamp (relative to `now`), saturating at zero.
    pub fn elapsed_since(&self, now: Timestamp) -> Duration {
        Duration::from_millis(now.0.saturating_sub(self.0))
    }

    /// Whether this timestamp + `duration` has passed relative to `now`.
    pub fn has_expired(&self, duration: Duration, now: Timestamp) -> bool {
        now >= self.saturating_add(duration)
    }

    pub fn saturating_add(&self, duration: Duration) -> Timestamp {
        let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        Self(self.0.saturating_add(millis))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

/// Source of the current protocol time.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall-clock time since the Unix epoch.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        Timestamp(u64::try_from(millis).unwrap_or(u64::MAX))
    }
}

/// Deferred work a node asks its host to hand back later.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimerEvent {
    /// Re-send stale unacknowledged messages on the link to `remote`.
    Retransmit { remote: Address },
    /// Acknowledgment deadline for one attempt of a bounded transmission.
    TransmissionTimeout { id: u64, attempt: u8 },
    /// Periodic admission-threshold recomputation.
    ThresholdTick,
    /// Periodic expiry of stale pending-feedback records.
    FeedbackSweep,
}

/// Schedules [`TimerEvent`]s for later delivery to the node at `owner`.
///
/// There is no cancellation: a handler receiving an event for state that has
/// already moved on simply ignores it.
pub trait Scheduler: Send + Sync {
    fn schedule_after(&self, owner: Address, delay: Duration, event: TimerEvent);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_since_saturates() {
        let later = Timestamp::from_millis(500);
        let earlier = Timestamp::from_millis(100);
        assert_eq!(earlier.elapsed_since(later), Duration::from_millis(400));
        assert_eq!(later.elapsed_since(earlier), Duration::ZERO);
    }

    #[test]
    fn has_expired_is_inclusive() {
        let t = Timestamp::from_secs(1);
        assert!(!t.has_expired(Duration::from_secs(2), Timestamp::from_millis(2999)));
        assert!(t.has_expired(Duration::from_secs(2), Timestamp::from_millis(3000)));
    }

    #[test]
    fn system_clock_is_after_epoch() {
        assert!(SystemClock.now() > Timestamp::EPOCH);
    }
}
