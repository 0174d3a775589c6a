//! Bounded transmission of control messages.
//!
//! The link layer retransmits forever; protocol roles need to know when a
//! peer stops answering. A transmission hands its message to the link up to
//! `max_attempts` times, each attempt under its own acknowledgment deadline,
//! and succeeds as soon as the link reports any of its sequence numbers as
//! acknowledged.

use std::collections::HashMap;
use std::time::Duration;

use vouch_messages::Body;
use vouch_types::{Address, IntroductionRequest};

use crate::RoleKey;

/// Attempts made when no other limit is configured.
pub const DEFAULT_MAX_ATTEMPTS: u8 = 3;

/// Link and timer access needed by the wrapper.
pub trait TransmissionPort {
    /// Hand `body` to the live link to `destination`, returning its sequence
    /// number. `None` when there is no live link to hand it to.
    fn hand_to_link(&mut self, destination: Address, body: Body) -> Option<u64>;

    /// Arrange for a `TransmissionTimeout { id, attempt }` after `delay`.
    fn schedule_timeout(&mut self, delay: Duration, id: u64, attempt: u8);

    /// Remove `request` from the references of the link to `destination`.
    fn drop_reference(&mut self, destination: Address, request: &IntroductionRequest);
}

/// Final result of one transmission, reported to its owner.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransmissionOutcome {
    pub id: u64,
    pub owner: Option<RoleKey>,
    pub destination: Address,
    pub delivered: bool,
}

#[derive(Debug)]
struct Transmission {
    destination: Address,
    body: Body,
    owner: Option<RoleKey>,
    attempts: u8,
    seqs: Vec<u64>,
}

/// Every in-flight transmission of one node.
#[derive(Debug)]
pub struct TransmissionTable {
    max_attempts: u8,
    ack_timeout: Duration,
    next_id: u64,
    active: HashMap<u64, Transmission>,
    by_seq: HashMap<(Address, u64), u64>,
    outcomes: Vec<TransmissionOutcome>,
}

impl TransmissionTable {
    pub fn new(max_attempts: u8, ack_timeout: Duration) -> Self {
        Self {
            max_attempts,
            ack_timeout,
            next_id: 1,
            active: HashMap::new(),
            by_seq: HashMap::new(),
            outcomes: Vec::new(),
        }
    }

    pub fn in_flight(&self) -> usize {
        self.active.len()
    }

    /// Take every finished outcome, oldest first.
    pub fn drain_outcomes(&mut self) -> Vec<TransmissionOutcome> {
        std::mem::take(&mut self.outcomes)
    }

    /// Begin transmitting `body`. Fails at once if there is no live link.
    pub fn start(
        &mut self,
        port: &mut dyn TransmissionPort,
        destination: Address,
        body: Body,
        owner: Option<RoleKey>,
    ) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.active.insert(
            id,
            Transmission {
                destination,
                body,
                owner,
                attempts: 0,
                seqs: Vec::new(),
            },
        );
        self.attempt(port, id);
        id
    }

    fn attempt(&mut self, port: &mut dyn TransmissionPort, id: u64) {
        let Some(tx) = self.active.get_mut(&id) else {
            return;
        };
        if tx.attempts >= self.max_attempts {
            self.fail(port, id, "attempts exhausted");
            return;
        }
        tx.attempts += 1;
        match port.hand_to_link(tx.destination, tx.body.clone()) {
            Some(seq) => {
                tx.seqs.push(seq);
                self.by_seq.insert((tx.destination, seq), id);
                port.schedule_timeout(self.ack_timeout, id, tx.attempts);
            }
            None => self.fail(port, id, "no live link"),
        }
    }

    /// The link to `remote` reports `seq` acknowledged.
    pub fn on_acknowledged(&mut self, remote: Address, seq: u64) {
        let Some(id) = self.by_seq.remove(&(remote, seq)) else {
            return;
        };
        if let Some(tx) = self.remove(id) {
            tracing::trace!(id, peer = %remote, attempts = tx.attempts, "transmission delivered");
            self.outcomes.push(TransmissionOutcome {
                id,
                owner: tx.owner,
                destination: tx.destination,
                delivered: true,
            });
        }
    }

    /// The acknowledgment deadline of `attempt` passed. Stale deadlines, for
    /// an earlier attempt or a finished transmission, are ignored.
    pub fn on_timeout(&mut self, port: &mut dyn TransmissionPort, id: u64, attempt: u8) {
        match self.active.get(&id) {
            Some(tx) if tx.attempts == attempt => {
                tracing::debug!(id, peer = %tx.destination, attempt, "transmission timed out");
                self.attempt(port, id);
            }
            _ => {}
        }
    }

    /// The link to `remote` closed: everything in flight to it fails.
    pub fn on_link_closed(&mut self, port: &mut dyn TransmissionPort, remote: Address) {
        let mut doomed: Vec<u64> = self
            .active
            .iter()
            .filter(|(_, tx)| tx.destination == remote)
            .map(|(id, _)| *id)
            .collect();
        doomed.sort_unstable();
        for id in doomed {
            self.fail(port, id, "link closed");
        }
    }

    fn fail(&mut self, port: &mut dyn TransmissionPort, id: u64, reason: &str) {
        let Some(tx) = self.remove(id) else {
            return;
        };
        tracing::debug!(id, peer = %tx.destination, kind = %tx.body.kind(), reason, "transmission failed");
        if let Some(request) = tx.body.request() {
            port.drop_reference(tx.destination, request);
        }
        self.outcomes.push(TransmissionOutcome {
            id,
            owner: tx.owner,
            destination: tx.destination,
            delivered: false,
        });
    }

    fn remove(&mut self, id: u64) -> Option<Transmission> {
        let tx = self.active.remove(&id)?;
        for seq in &tx.seqs {
            self.by_seq.remove(&(tx.destination, *seq));
        }
        Some(tx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vouch_types::NonceSource;

    const DEST: Address = Address::new(2);
    const TIMEOUT: Duration = Duration::from_millis(200);

    #[derive(Default)]
    struct TestPort {
        live: bool,
        next_seq: u64,
        handed: Vec<(Address, Body)>,
        timeouts: Vec<(u64, u8)>,
        dropped: Vec<(Address, IntroductionRequest)>,
    }

    impl TestPort {
        fn live() -> Self {
            Self {
                live: true,
                ..Default::default()
            }
        }
    }

    impl TransmissionPort for TestPort {
        fn hand_to_link(&mut self, destination: Address, body: Body) -> Option<u64> {
            if !self.live {
                return None;
            }
            self.next_seq += 1;
            self.handed.push((destination, body));
            Some(self.next_seq)
        }

        fn schedule_timeout(&mut self, _delay: Duration, id: u64, attempt: u8) {
            self.timeouts.push((id, attempt));
        }

        fn drop_reference(&mut self, destination: Address, request: &IntroductionRequest) {
            self.dropped.push((destination, *request));
        }
    }

    fn request() -> IntroductionRequest {
        IntroductionRequest::new(&NonceSource::new(), Address::new(1), DEST, Address::new(3))
    }

    fn table() -> TransmissionTable {
        TransmissionTable::new(DEFAULT_MAX_ATTEMPTS, TIMEOUT)
    }

    #[test]
    fn ack_of_any_attempt_completes() {
        let mut port = TestPort::live();
        let mut table = table();
        let owner = Some(RoleKey::Requester(request()));
        let id = table.start(&mut port, DEST, Body::IntroductionRequest { request: request() }, owner);

        table.on_timeout(&mut port, id, 1);
        assert_eq!(port.handed.len(), 2);

        // The first attempt's sequence number is acknowledged late.
        table.on_acknowledged(DEST, 1);
        let outcomes = table.drain_outcomes();
        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].delivered);
        assert_eq!(outcomes[0].owner, owner);
        assert_eq!(table.in_flight(), 0);

        // The second attempt's ack is now meaningless.
        table.on_acknowledged(DEST, 2);
        assert!(table.drain_outcomes().is_empty());
    }

    #[test]
    fn gives_up_after_max_attempts() {
        let mut port = TestPort::live();
        let mut table = table();
        let r = request();
        let id = table.start(&mut port, DEST, Body::IntroductionDenied { request: r }, None);

        table.on_timeout(&mut port, id, 1);
        table.on_timeout(&mut port, id, 2);
        assert_eq!(port.handed.len(), 3);
        assert!(table.drain_outcomes().is_empty());

        table.on_timeout(&mut port, id, 3);
        assert_eq!(port.handed.len(), 3);
        let outcomes = table.drain_outcomes();
        assert_eq!(outcomes.len(), 1);
        assert!(!outcomes[0].delivered);
        assert_eq!(port.dropped, vec![(DEST, r)]);
    }

    #[test]
    fn stale_timeout_is_ignored() {
        let mut port = TestPort::live();
        let mut table = table();
        let id = table.start(&mut port, DEST, Body::IntroductionRequest { request: request() }, None);
        table.on_timeout(&mut port, id, 1);
        assert_eq!(port.timeouts, vec![(id, 1), (id, 2)]);

        table.on_timeout(&mut port, id, 1);
        assert_eq!(port.handed.len(), 2);

        table.on_acknowledged(DEST, 2);
        table.on_timeout(&mut port, id, 2);
        assert_eq!(port.handed.len(), 2);
    }

    #[test]
    fn no_live_link_fails_immediately() {
        let mut port = TestPort::default();
        let mut table = table();
        table.start(&mut port, DEST, Body::IntroductionRequest { request: request() }, None);
        let outcomes = table.drain_outcomes();
        assert_eq!(outcomes.len(), 1);
        assert!(!outcomes[0].delivered);
        assert_eq!(table.in_flight(), 0);
    }

    #[test]
    fn link_closure_fails_only_that_destination() {
        let mut port = TestPort::live();
        let mut table = table();
        let r = request();
        table.start(&mut port, DEST, Body::IntroductionRequest { request: r }, None);
        table.start(&mut port, Address::new(7), Body::IntroductionRequest { request: r }, None);

        table.on_link_closed(&mut port, DEST);
        let outcomes = table.drain_outcomes();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].destination, DEST);
        assert_eq!(table.in_flight(), 1);
    }

    #[test]
    fn ack_from_other_link_does_not_match() {
        let mut port = TestPort::live();
        let mut table = table();
        table.start(&mut port, DEST, Body::IntroductionRequest { request: request() }, None);
        table.on_acknowledged(Address::new(9), 1);
        assert!(table.drain_outcomes().is_empty());
        assert_eq!(table.in_flight(), 1);
    }
}
