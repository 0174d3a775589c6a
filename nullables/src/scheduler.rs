//! Nullable scheduler: a timer queue the test drains by hand.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use vouch_types::{Address, Clock, Scheduler, TimerEvent, Timestamp};

use crate::NullClock;

#[derive(Debug)]
struct Scheduled {
    due: Timestamp,
    /// Insertion order; breaks ties between events due at the same time.
    seq: u64,
    owner: Address,
    event: TimerEvent,
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Scheduled {}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.due, self.seq).cmp(&(other.due, other.seq))
    }
}

/// Records every scheduled timer. Nothing fires on its own: the test pops due
/// events and hands them to their owners.
#[derive(Debug)]
pub struct NullScheduler {
    clock: Arc<NullClock>,
    queue: Mutex<BinaryHeap<Reverse<Scheduled>>>,
    next_seq: AtomicU64,
}

impl NullScheduler {
    pub fn new(clock: Arc<NullClock>) -> Self {
        Self {
            clock,
            queue: Mutex::new(BinaryHeap::new()),
            next_seq: AtomicU64::new(0),
        }
    }

    /// Remove and return the earliest event due at or before `now`.
    pub fn pop_due(&self, now: Timestamp) -> Option<(Address, TimerEvent)> {
        let mut queue = self.queue.lock().unwrap();
        if !queue.peek().is_some_and(|Reverse(next)| next.due <= now) {
            return None;
        }
        queue.pop().map(|Reverse(s)| (s.owner, s.event))
    }

    /// When the earliest pending event is due.
    pub fn next_due(&self) -> Option<Timestamp> {
        self.queue.lock().unwrap().peek().map(|Reverse(s)| s.due)
    }

    pub fn pending(&self) -> usize {
        self.queue.lock().unwrap().len()
    }

    /// Pending events, in firing order.
    pub fn snapshot(&self) -> Vec<(Timestamp, Address, TimerEvent)> {
        let queue = self.queue.lock().unwrap();
        let mut all: Vec<&Scheduled> = queue.iter().map(|Reverse(s)| s).collect();
        all.sort();
        all.into_iter().map(|s| (s.due, s.owner, s.event)).collect()
    }
}

impl Scheduler for NullScheduler {
    fn schedule_after(&self, owner: Address, delay: Duration, event: TimerEvent) {
        let due = self.clock.now().saturating_add(delay);
        let seq = self.next_seq.fetch_add(1, AtomicOrdering::SeqCst);
        self.queue.lock().unwrap().push(Reverse(Scheduled {
            due,
            seq,
            owner,
            event,
        }));
    }
}
