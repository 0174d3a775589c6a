//! The per-neighbor link state machine.

use std::collections::{HashSet, VecDeque};
use std::time::Duration;

use vouch_messages::{encode_message, Body, Message};
use vouch_types::{Address, IntroductionRequest, Timestamp};

use crate::{Channel, LinkError};

/// Shortest delay used when re-arming the retransmit sweep.
const MIN_REARM_DELAY: Duration = Duration::from_millis(1);

/// Lifecycle of a link.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkState {
    /// Created; the channel is not yet confirmed bidirectional.
    Nascent,
    /// Normal operation.
    Open,
    /// No longer referenced; draining the unacknowledged queue.
    HalfClosed,
    /// Terminal.
    Closed,
}

/// Something the owning node must act on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LinkEffect {
    /// The peer's cumulative acknowledgment covered our message `seq`.
    Acknowledged { seq: u64 },
    /// Deliver a `Retransmit` timer for this link after `delay`.
    ArmRetransmit { delay: Duration },
    /// The link reached `Closed`. Emitted exactly once per link.
    Closed { forced: bool },
}

/// What became of an inbound message.
#[derive(Debug)]
pub enum Received {
    /// Next in sequence; hand it to the protocol layer.
    Accepted(Message),
    /// Already seen; a bare acknowledgment was re-sent.
    Duplicate,
    /// Beyond the next expected sequence number; dropped.
    OutOfOrder { seq: u64, expected: u64 },
    /// A transport acknowledgment; fully handled by the link.
    Acknowledgment,
}

#[derive(Debug)]
struct Unacked {
    seq: u64,
    /// The encoded frame, re-sent verbatim on retransmission.
    frame: Vec<u8>,
    sent_at: Timestamp,
}

/// Reliable transport state for one (local, remote) pair.
pub struct Link {
    local: Address,
    remote: Address,
    state: LinkState,
    channel: Box<dyn Channel>,
    /// Sequence number for the next acknowledgable message.
    next_seq: u64,
    /// Last contiguous sequence number received from the peer.
    lcsnr: u64,
    unacked: VecDeque<Unacked>,
    /// Requests justifying an ephemeral link; `None` for a-priori links.
    references: Option<HashSet<IntroductionRequest>>,
    retransmit_timeout: Duration,
    retransmit_armed: bool,
    retransmissions: u64,
    effects: Vec<LinkEffect>,
}

impl Link {
    /// A long-lived link that is never closed by reference counting.
    pub fn a_priori(
        local: Address,
        remote: Address,
        channel: Box<dyn Channel>,
        retransmit_timeout: Duration,
    ) -> Self {
        Self::with_references(local, remote, channel, retransmit_timeout, None)
    }

    /// A link that lives only while some introduction references it.
    pub fn ephemeral(
        local: Address,
        remote: Address,
        channel: Box<dyn Channel>,
        retransmit_timeout: Duration,
        first_reference: IntroductionRequest,
    ) -> Self {
        let references = HashSet::from([first_reference]);
        Self::with_references(local, remote, channel, retransmit_timeout, Some(references))
    }

    fn with_references(
        local: Address,
        remote: Address,
        channel: Box<dyn Channel>,
        retransmit_timeout: Duration,
        references: Option<HashSet<IntroductionRequest>>,
    ) -> Self {
        Self {
            local,
            remote,
            state: LinkState::Nascent,
            channel,
            next_seq: 1,
            lcsnr: 0,
            unacked: VecDeque::new(),
            references,
            retransmit_timeout,
            retransmit_armed: false,
            retransmissions: 0,
            effects: Vec::new(),
        }
    }

    // -- Queries ---------------------------------------------------------------

    pub fn local(&self) -> Address {
        self.local
    }

    pub fn remote(&self) -> Address {
        self.remote
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Whether the link can still carry traffic.
    pub fn is_live(&self) -> bool {
        self.state != LinkState::Closed
    }

    pub fn is_ephemeral(&self) -> bool {
        self.references.is_some()
    }

    /// Last contiguous sequence number received from the peer.
    pub fn lcsnr(&self) -> u64 {
        self.lcsnr
    }

    /// Sequence numbers still awaiting acknowledgment, oldest first.
    pub fn unacked_seqs(&self) -> Vec<u64> {
        self.unacked.iter().map(|u| u.seq).collect()
    }

    pub fn has_reference(&self, request: &IntroductionRequest) -> bool {
        self.references
            .as_ref()
            .is_some_and(|refs| refs.contains(request))
    }

    pub fn reference_count(&self) -> usize {
        self.references.as_ref().map_or(0, HashSet::len)
    }

    /// Total messages re-sent by the retransmit sweep.
    pub fn retransmissions(&self) -> u64 {
        self.retransmissions
    }

    /// Take every pending effect, oldest first.
    pub fn drain_effects(&mut self) -> Vec<LinkEffect> {
        std::mem::take(&mut self.effects)
    }

    // -- Channel events --------------------------------------------------------

    /// The channel is confirmed bidirectional: open and flush anything queued
    /// while nascent.
    pub fn on_channel_ready(&mut self, now: Timestamp) {
        if self.state != LinkState::Nascent {
            return;
        }
        self.state = LinkState::Open;
        tracing::debug!(peer = %self.remote, queued = self.unacked.len(), "link open");

        let mut failure = None;
        for entry in self.unacked.iter_mut() {
            if let Err(e) = self.channel.transmit(&entry.frame) {
                failure = Some(e);
                break;
            }
            entry.sent_at = now;
        }
        if let Some(e) = failure {
            tracing::warn!(peer = %self.remote, error = %e, "flush failed, force-closing link");
            self.force_close();
            return;
        }
        self.arm_retransmit(now);
    }

    /// The channel went away underneath us.
    pub fn on_channel_closed(&mut self) {
        tracing::debug!(peer = %self.remote, "channel closed by transport");
        self.force_close();
    }

    // -- Sending ---------------------------------------------------------------

    /// Queue and transmit `body`. Returns the sequence number assigned to an
    /// acknowledgable message.
    ///
    /// A channel failure does not surface here: the link force-closes and
    /// reports [`LinkEffect::Closed`].
    pub fn send(&mut self, body: Body, now: Timestamp) -> Result<Option<u64>, LinkError> {
        if self.state == LinkState::Closed {
            return Err(LinkError::Closed {
                remote: self.remote,
            });
        }

        let mut message = Message::new(self.local, self.remote, body);
        message.lcsnr = Some(self.lcsnr);

        if !message.body.is_acknowledgable() {
            let frame = encode_message(&message)?;
            if self.state != LinkState::Nascent {
                self.write(&frame);
            }
            return Ok(None);
        }

        let seq = self.next_seq;
        message.seq = Some(seq);
        let frame = encode_message(&message)?;
        self.next_seq += 1;

        if self.state != LinkState::Nascent && !self.write(&frame) {
            return Ok(Some(seq));
        }
        self.unacked.push_back(Unacked {
            seq,
            frame,
            sent_at: now,
        });
        self.arm_retransmit(now);
        Ok(Some(seq))
    }

    /// Write one frame; on failure force-close and return `false`.
    fn write(&mut self, frame: &[u8]) -> bool {
        match self.channel.transmit(frame) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(peer = %self.remote, error = %e, "channel write failed, force-closing link");
                self.force_close();
                false
            }
        }
    }

    fn send_ack(&mut self, body: Body) {
        if self.state == LinkState::Nascent {
            return;
        }
        let mut message = Message::new(self.local, self.remote, body);
        message.lcsnr = Some(self.lcsnr);
        match encode_message(&message) {
            Ok(frame) => {
                self.write(&frame);
            }
            Err(e) => tracing::error!(peer = %self.remote, error = %e, "failed to encode acknowledgment"),
        }
    }

    // -- Receiving -------------------------------------------------------------

    /// Process one inbound message from the peer.
    ///
    /// Only the next contiguous sequence number is accepted. Duplicates are
    /// re-acknowledged and dropped; anything past a gap is dropped without
    /// buffering, leaving recovery to the sender's retransmission.
    pub fn receive(&mut self, message: Message, now: Timestamp) -> Result<Received, LinkError> {
        if self.state == LinkState::Closed {
            return Err(LinkError::ClosedLinkTraffic {
                remote: self.remote,
            });
        }

        if let Some(watermark) = message.lcsnr {
            self.acknowledge_through(watermark);
        }

        let received = if !message.body.is_acknowledgable() {
            Received::Acknowledgment
        } else {
            let Some(seq) = message.seq else {
                return Err(LinkError::Unsequenced {
                    remote: self.remote,
                    kind: message.kind(),
                });
            };
            if seq <= self.lcsnr {
                tracing::trace!(peer = %self.remote, seq, "duplicate, re-acknowledging");
                self.send_ack(Body::PlainAck);
                Received::Duplicate
            } else if seq == self.lcsnr + 1 {
                self.lcsnr = seq;
                self.send_ack(Body::Acknowledge { seq });
                Received::Accepted(message)
            } else {
                let expected = self.lcsnr + 1;
                tracing::debug!(peer = %self.remote, seq, expected, "sequence gap, dropping");
                Received::OutOfOrder { seq, expected }
            }
        };

        self.finish_drain_if_empty();
        self.arm_retransmit(now);
        Ok(received)
    }

    /// Drop every queued message covered by the peer's cumulative watermark.
    fn acknowledge_through(&mut self, watermark: u64) {
        let effects = &mut self.effects;
        self.unacked.retain(|entry| {
            if entry.seq <= watermark {
                effects.push(LinkEffect::Acknowledged { seq: entry.seq });
                false
            } else {
                true
            }
        });
    }

    // -- Retransmission --------------------------------------------------------

    /// Handle the retransmit timer: re-send, verbatim, every message older
    /// than the timeout, then re-arm while anything is still outstanding.
    pub fn retransmit_due(&mut self, now: Timestamp) {
        self.retransmit_armed = false;
        if !matches!(self.state, LinkState::Open | LinkState::HalfClosed) {
            return;
        }

        let timeout = self.retransmit_timeout;
        let mut failure = None;
        for entry in self.unacked.iter_mut() {
            if entry.sent_at.elapsed_since(now) < timeout {
                continue;
            }
            if let Err(e) = self.channel.transmit(&entry.frame) {
                failure = Some(e);
                break;
            }
            entry.sent_at = now;
            self.retransmissions += 1;
            tracing::trace!(peer = %self.remote, seq = entry.seq, "retransmitted");
        }
        if let Some(e) = failure {
            tracing::warn!(peer = %self.remote, error = %e, "retransmit failed, force-closing link");
            self.force_close();
            return;
        }
        self.arm_retransmit(now);
    }

    fn arm_retransmit(&mut self, now: Timestamp) {
        if self.retransmit_armed || !matches!(self.state, LinkState::Open | LinkState::HalfClosed) {
            return;
        }
        let Some(oldest) = self.unacked.iter().map(|u| u.sent_at).min() else {
            return;
        };
        let delay = self
            .retransmit_timeout
            .saturating_sub(oldest.elapsed_since(now))
            .max(MIN_REARM_DELAY);
        self.retransmit_armed = true;
        self.effects.push(LinkEffect::ArmRetransmit { delay });
    }

    // -- References & teardown -------------------------------------------------

    /// Record that `request` also justifies this link. Re-opens a half-closed
    /// link. Returns `false` for a-priori links, which are never reference
    /// counted.
    pub fn add_reference(&mut self, request: IntroductionRequest) -> Result<bool, LinkError> {
        if self.state == LinkState::Closed {
            return Err(LinkError::Closed {
                remote: self.remote,
            });
        }
        let Some(refs) = self.references.as_mut() else {
            return Ok(false);
        };
        let added = refs.insert(request);
        if self.state == LinkState::HalfClosed {
            self.state = LinkState::Open;
            tracing::debug!(peer = %self.remote, request = %request, "half-closed link re-opened");
        }
        Ok(added)
    }

    /// Drop `request` from the references. Removing the last one begins a
    /// graceful half-close. Returns whether the request was present.
    pub fn remove_reference(&mut self, request: &IntroductionRequest) -> bool {
        let Some(refs) = self.references.as_mut() else {
            return false;
        };
        if !refs.remove(request) {
            return false;
        }
        if refs.is_empty() && matches!(self.state, LinkState::Nascent | LinkState::Open) {
            self.begin_half_close();
        }
        true
    }

    /// Begin graceful teardown: close once the unacknowledged queue drains.
    pub fn close(&mut self) {
        if matches!(self.state, LinkState::Nascent | LinkState::Open) {
            self.begin_half_close();
        }
    }

    /// Close immediately, discarding everything pending.
    pub fn force_close(&mut self) {
        if self.state == LinkState::Closed {
            return;
        }
        self.unacked.clear();
        if let Some(refs) = self.references.as_mut() {
            refs.clear();
        }
        self.retransmit_armed = false;
        self.finish_close(true);
    }

    fn begin_half_close(&mut self) {
        self.state = LinkState::HalfClosed;
        tracing::debug!(peer = %self.remote, pending = self.unacked.len(), "link half-closed");
        self.finish_drain_if_empty();
    }

    fn finish_drain_if_empty(&mut self) {
        if self.state == LinkState::HalfClosed && self.unacked.is_empty() {
            self.finish_close(false);
        }
    }

    fn finish_close(&mut self, forced: bool) {
        if self.state == LinkState::Closed {
            return;
        }
        self.state = LinkState::Closed;
        tracing::debug!(peer = %self.remote, forced, "link closed");
        self.effects.push(LinkEffect::Closed { forced });
    }
}

impl std::fmt::Debug for Link {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Link")
            .field("local", &self.local)
            .field("remote", &self.remote)
            .field("state", &self.state)
            .field("next_seq", &self.next_seq)
            .field("lcsnr", &self.lcsnr)
            .field("unacked", &self.unacked_seqs())
            .field("references", &self.reference_count())
            .finish()
    }
}
