//! The node actor.
//!
//! A [`Node`] owns everything one address knows: its links, the bounded
//! transmissions in flight, the protocol roles it plays, its reputation view
//! of other nodes and the feedback it owes or expects. Every input (a frame,
//! a channel notification, a timer) goes through a `&mut self` handler and is
//! settled completely before the handler returns: link effects, transmission
//! outcomes and protocol events are drained until nothing is left.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, trace, warn};

use vouch_introduction::{
    ChainId, ChainResult, DenialSink, Discovery, ProtocolContext, ProtocolEvent, ProtocolFault,
    ProtocolRegistry, RequesterOutcome, RoleKey, TargetOutcome, TransmissionPort,
    TransmissionTable,
};
use vouch_link::{ChannelFactory, Link, LinkEffect, LinkError, LinkTable, Received};
use vouch_messages::{decode_message, Body, FeedbackKind};
use vouch_reputation::{
    ExpiringLedger, IncomingFeedback, OutgoingFeedback, PedigreeBook, ReputationSystem, Verdict,
};
use vouch_types::{
    Address, Clock, IntroductionRequest, NonceSource, Pedigree, Scheduler, TimerEvent, Timestamp,
};

use crate::tracing_spans::{feedback_span, frame_recv_span, introduction_span, timer_span};
use crate::{NodeConfig, NodeError, NodeEvent, NodeMetrics};

/// The collaborators a node is wired to.
#[derive(Clone)]
pub struct NodeServices {
    pub clock: Arc<dyn Clock>,
    pub scheduler: Arc<dyn Scheduler>,
    pub channels: Arc<dyn ChannelFactory>,
    pub discovery: Arc<dyn Discovery>,
    pub denials: Arc<dyn DenialSink>,
    /// Shared by every node of a process so that nonces never repeat.
    pub nonces: Arc<NonceSource>,
}

pub struct Node {
    protocols: ProtocolRegistry,
    core: NodeCore,
    /// Payloads received from peers, oldest first.
    inbox: Vec<(Address, Vec<u8>)>,
    /// Both expire with the feedback records.
    chain_results: ExpiringLedger<ChainResult, ChainId>,
    request_outcomes: ExpiringLedger<RequesterOutcome>,
}

/// Everything the protocol roles may touch, split from the registry so that
/// the registry can borrow it mutably while dispatching.
struct NodeCore {
    local: Address,
    config: NodeConfig,
    services: NodeServices,
    links: LinkTable,
    transmissions: TransmissionTable,
    reputation: ReputationSystem,
    pedigrees: PedigreeBook,
    to_send: ExpiringLedger<OutgoingFeedback>,
    to_receive: ExpiringLedger<IncomingFeedback>,
    /// Feedback already applied here. A wrapper retry whose first attempt
    /// arrived carries a fresh link sequence number and gets this far.
    feedback_seen: ExpiringLedger<()>,
    metrics: NodeMetrics,
}

/// The link table seen from the transmission wrapper.
struct LinkPort<'a> {
    local: Address,
    now: Timestamp,
    links: &'a mut LinkTable,
    scheduler: &'a dyn Scheduler,
}

impl TransmissionPort for LinkPort<'_> {
    fn hand_to_link(&mut self, destination: Address, body: Body) -> Option<u64> {
        let link = self.links.live_mut(&destination)?;
        match link.send(body, self.now) {
            Ok(seq) => seq,
            Err(e) => {
                warn!(peer = %destination, error = %e, "link refused protocol message");
                None
            }
        }
    }

    fn schedule_timeout(&mut self, delay: Duration, id: u64, attempt: u8) {
        self.scheduler.schedule_after(
            self.local,
            delay,
            TimerEvent::TransmissionTimeout { id, attempt },
        );
    }

    fn drop_reference(&mut self, destination: Address, request: &IntroductionRequest) {
        if let Some(link) = self.links.get_mut(&destination) {
            if link.remove_reference(request) {
                debug!(peer = %destination, request = %request, "reference dropped after failed transmission");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// NodeCore
// ---------------------------------------------------------------------------

impl NodeCore {
    fn clock_now(&self) -> Timestamp {
        self.services.clock.now()
    }

    /// The transmission table together with a port onto the links.
    fn wrapper(&mut self) -> (&mut TransmissionTable, LinkPort<'_>) {
        let now = self.services.clock.now();
        let port = LinkPort {
            local: self.local,
            now,
            links: &mut self.links,
            scheduler: self.services.scheduler.as_ref(),
        };
        (&mut self.transmissions, port)
    }

    fn open_link(&mut self, remote: Address, reference: Option<IntroductionRequest>) {
        let channel = self.services.channels.open(self.local, remote);
        let timeout = self.config.link.retransmit_timeout();
        let link = match reference {
            Some(request) => Link::ephemeral(self.local, remote, channel, timeout, request),
            None => Link::a_priori(self.local, remote, channel, timeout),
        };
        if let Some(old) = self.links.insert(link) {
            debug!(peer = %remote, state = ?old.state(), "replaced link");
        }
    }

    fn apply_feedback(&mut self, pedigree: &Pedigree, kind: FeedbackKind) {
        let now = self.clock_now();
        let touched = self.reputation.apply_feedback(pedigree, kind, now);
        self.metrics.feedback_applied.inc();
        self.metrics.set_threshold(self.reputation.threshold());
        debug!(subject = %pedigree.subject(), ?kind, touched, "feedback applied");
    }

    /// Feedback on `request` arrived from `from`.
    fn receive_feedback(
        &mut self,
        from: Address,
        request: IntroductionRequest,
        kind: FeedbackKind,
    ) -> Result<(), ProtocolFault> {
        let _span = feedback_span(self.local, &request).entered();
        let Some(record) = self.to_receive.remove(&request) else {
            if self.feedback_seen.contains(&request) {
                trace!(peer = %from, ?kind, "repeated feedback dropped");
                return Ok(());
            }
            return Err(ProtocolFault::UnknownFeedback { request });
        };
        let now = self.clock_now();
        self.feedback_seen.insert(request, (), now);
        info!(peer = %from, ?kind, "feedback received");
        self.apply_feedback(&record.pedigree, kind);
        if let Some(prior) = record.prior {
            debug!(prior = %prior, to = %prior.introducer(), "forwarding feedback");
            self.transmit(prior.introducer(), Body::Feedback { request: prior, kind }, None);
        }
        Ok(())
    }
}

impl ProtocolContext for NodeCore {
    fn local(&self) -> Address {
        self.local
    }

    fn now(&self) -> Timestamp {
        self.clock_now()
    }

    fn new_request(&mut self, introducer: Address, destination: Address) -> IntroductionRequest {
        IntroductionRequest::new(&self.services.nonces, self.local, introducer, destination)
    }

    fn transmit(&mut self, destination: Address, body: Body, owner: Option<RoleKey>) {
        let (table, mut port) = self.wrapper();
        table.start(&mut port, destination, body, owner);
    }

    fn send_data(&mut self, destination: Address, payload: Vec<u8>) {
        let now = self.clock_now();
        let Some(link) = self.links.live_mut(&destination) else {
            warn!(peer = %destination, "no live link for payload");
            return;
        };
        if let Err(e) = link.send(Body::Data(payload), now) {
            warn!(peer = %destination, error = %e, "payload not sent");
        }
    }

    fn has_live_link(&self, remote: Address) -> bool {
        self.links.contains_live(&remote)
    }

    fn create_ephemeral_link(&mut self, remote: Address, request: IntroductionRequest) {
        if self.links.contains_live(&remote) {
            self.add_link_reference(remote, request);
            return;
        }
        info!(peer = %remote, request = %request, "opening ephemeral link");
        self.open_link(remote, Some(request));
    }

    fn add_link_reference(&mut self, remote: Address, request: IntroductionRequest) {
        let Some(link) = self.links.live_mut(&remote) else {
            warn!(peer = %remote, request = %request, "no live link to reference");
            return;
        };
        match link.add_reference(request) {
            Ok(added) => debug!(peer = %remote, request = %request, added, "reference added"),
            Err(e) => warn!(peer = %remote, error = %e, "reference not added"),
        }
    }

    fn release_reference(&mut self, remote: Address, request: IntroductionRequest) {
        let now = self.clock_now();
        let Some(link) = self.links.live_mut(&remote) else {
            return;
        };
        if !link.has_reference(&request) {
            return;
        }
        // Tell the peer first: dropping the last reference may close the link.
        if let Err(e) = link.send(Body::RemoveIntroductionReference { request }, now) {
            warn!(peer = %remote, error = %e, "remove-reference not sent");
        }
        link.remove_reference(&request);
        debug!(peer = %remote, request = %request, "reference released");
    }

    fn next_hop(&self, destination: Address, attempt: usize) -> Option<Address> {
        self.services
            .discovery
            .next_hop_toward(self.local, destination, attempt)
    }

    fn proxy_for(&self, destination: Address) -> Option<Address> {
        self.services.discovery.proxy_for(destination)
    }

    fn pedigree_of(&self, peer: Address) -> Pedigree {
        self.pedigrees.pedigree_of(peer)
    }

    fn record_pedigree(&mut self, pedigree: Pedigree) {
        self.pedigrees.record(pedigree);
    }

    fn gate(&mut self, pedigree: &Pedigree) -> Verdict {
        let now = self.clock_now();
        let verdict = self.reputation.accept(pedigree, now);
        debug!(subject = %pedigree.subject(), ?verdict, "trust gate");
        verdict
    }

    fn owe_feedback(&mut self, request: IntroductionRequest, record: OutgoingFeedback) {
        let now = self.clock_now();
        self.to_send.insert(request, record, now);
    }

    fn expect_feedback(&mut self, request: IntroductionRequest, record: IncomingFeedback) {
        let now = self.clock_now();
        self.to_receive.insert(request, record, now);
    }

    fn denied_at_depth(&mut self, depth: u32) {
        self.services.denials.denied_at_depth(depth);
    }
}

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

impl Node {
    pub fn new(local: Address, config: NodeConfig, services: NodeServices) -> Self {
        let reputation = ReputationSystem::new(config.reputation.clone());
        let transmissions = TransmissionTable::new(
            config.transmission.max_attempts,
            config.transmission.ack_timeout(),
        );
        let metrics = NodeMetrics::new();
        metrics.set_threshold(reputation.threshold());

        services.scheduler.schedule_after(
            local,
            config.reputation.controller.tick_period(),
            TimerEvent::ThresholdTick,
        );
        services.scheduler.schedule_after(
            local,
            config.feedback.sweep_period(),
            TimerEvent::FeedbackSweep,
        );

        Self {
            protocols: ProtocolRegistry::new(),
            core: NodeCore {
                local,
                config,
                services,
                links: LinkTable::new(),
                transmissions,
                reputation,
                pedigrees: PedigreeBook::new(),
                to_send: ExpiringLedger::new(),
                to_receive: ExpiringLedger::new(),
                feedback_seen: ExpiringLedger::new(),
                metrics,
            },
            inbox: Vec::new(),
            chain_results: ExpiringLedger::new(),
            request_outcomes: ExpiringLedger::new(),
        }
    }

    // -- Accessors -----------------------------------------------------------

    pub fn address(&self) -> Address {
        self.core.local
    }

    pub fn config(&self) -> &NodeConfig {
        &self.core.config
    }

    pub fn metrics(&self) -> &NodeMetrics {
        &self.core.metrics
    }

    pub fn link(&self, remote: Address) -> Option<&Link> {
        self.core.links.get(&remote)
    }

    pub fn has_live_link(&self, remote: Address) -> bool {
        self.core.links.contains_live(&remote)
    }

    pub fn reputation(&self) -> &ReputationSystem {
        &self.core.reputation
    }

    pub fn protocols(&self) -> &ProtocolRegistry {
        &self.protocols
    }

    /// Whether this node, as a target, still owes feedback on `request`.
    pub fn owes_feedback(&self, request: &IntroductionRequest) -> bool {
        self.core.to_send.contains(request)
    }

    /// Whether this node, as an introducer, still expects feedback on
    /// `request`.
    pub fn expects_feedback(&self, request: &IntroductionRequest) -> bool {
        self.core.to_receive.contains(request)
    }

    pub fn pending_feedback(&self) -> (usize, usize) {
        (self.core.to_send.len(), self.core.to_receive.len())
    }

    pub fn chain_result(&self, chain: ChainId) -> Option<ChainResult> {
        self.chain_results.get(&chain).copied()
    }

    /// Finished chains and requests still remembered, in that order.
    pub fn retained_results(&self) -> (usize, usize) {
        (self.chain_results.len(), self.request_outcomes.len())
    }

    pub fn request_outcome(&self, request: &IntroductionRequest) -> Option<&RequesterOutcome> {
        self.request_outcomes.get(request)
    }

    /// A finished introduction this node asked `introducer` for.
    pub fn finished_request(
        &self,
        introducer: Address,
        destination: Address,
    ) -> Option<(IntroductionRequest, &RequesterOutcome)> {
        self.request_outcomes
            .iter()
            .filter(|(r, _)| r.introducer() == introducer && r.destination() == destination)
            .max_by_key(|(r, _)| r.nonce())
            .map(|(r, outcome)| (*r, outcome))
    }

    /// Take the payloads received so far.
    pub fn take_inbox(&mut self) -> Vec<(Address, Vec<u8>)> {
        std::mem::take(&mut self.inbox)
    }

    // -- Host inputs ---------------------------------------------------------

    pub fn handle(&mut self, event: NodeEvent) -> Result<(), NodeError> {
        match event {
            NodeEvent::Frame(bytes) => self.receive_frame(&bytes),
            NodeEvent::ChannelReady { remote } => {
                self.on_channel_ready(remote);
                Ok(())
            }
            NodeEvent::ChannelClosed { remote } => {
                self.on_channel_closed(remote);
                Ok(())
            }
            NodeEvent::Timer(timer) => {
                self.on_timer(timer);
                Ok(())
            }
        }
    }

    /// Open a long-lived link to `remote`.
    pub fn connect(&mut self, remote: Address) {
        if self.core.links.contains_live(&remote) {
            return;
        }
        info!(node = %self.core.local, peer = %remote, "connecting");
        self.core.open_link(remote, None);
        self.settle();
    }

    pub fn on_channel_ready(&mut self, remote: Address) {
        let now = self.core.clock_now();
        match self.core.links.get_mut(&remote) {
            Some(link) => link.on_channel_ready(now),
            None => debug!(peer = %remote, "ready for unknown link"),
        }
        self.settle();
    }

    pub fn on_channel_closed(&mut self, remote: Address) {
        if let Some(link) = self.core.links.get_mut(&remote) {
            warn!(node = %self.core.local, peer = %remote, "channel closed");
            link.on_channel_closed();
        }
        self.settle();
    }

    /// Decode and process one inbound frame.
    pub fn receive_frame(&mut self, frame: &[u8]) -> Result<(), NodeError> {
        let message = decode_message(frame)?;
        self.core.metrics.frames_received.inc();
        let local = self.core.local;
        let from = message.src;
        let _span = frame_recv_span(local, from, message.kind()).entered();
        if message.dst != local {
            return Err(NodeError::Misdelivered {
                dst: message.dst,
                local,
            });
        }

        let now = self.core.clock_now();
        let received = match self.core.links.get_mut(&from) {
            Some(link) => link.receive(message, now),
            None => Err(LinkError::ClosedLinkTraffic { remote: from }),
        };
        let result: Result<(), NodeError> = match received {
            Ok(Received::Accepted(message)) => self.dispatch(from, message.body),
            Ok(Received::Duplicate) | Ok(Received::OutOfOrder { .. }) => {
                self.core.metrics.frames_dropped.inc();
                Ok(())
            }
            Ok(Received::Acknowledgment) => Ok(()),
            Err(LinkError::ClosedLinkTraffic { remote }) => {
                Err(ProtocolFault::ClosedLinkTraffic { remote }.into())
            }
            Err(e) => Err(e.into()),
        };
        self.settle();
        if let Err(e) = &result {
            self.note_error(e);
        }
        result
    }

    pub fn on_timer(&mut self, event: TimerEvent) {
        let local = self.core.local;
        let now = self.core.clock_now();
        match event {
            TimerEvent::Retransmit { remote } => {
                if let Some(link) = self.core.links.get_mut(&remote) {
                    let before = link.retransmissions();
                    link.retransmit_due(now);
                    let resent = link.retransmissions() - before;
                    if resent > 0 {
                        self.core.metrics.retransmissions.inc_by(resent);
                    }
                }
            }
            TimerEvent::TransmissionTimeout { id, attempt } => {
                let (table, mut port) = self.core.wrapper();
                table.on_timeout(&mut port, id, attempt);
            }
            TimerEvent::ThresholdTick => {
                let _span = timer_span(local, "threshold_tick").entered();
                let threshold = self.core.reputation.update_threshold(now);
                self.core.metrics.set_threshold(threshold);
                debug!(threshold, health = self.core.reputation.health(), "threshold updated");
                let period = self.core.config.reputation.controller.tick_period();
                self.core
                    .services
                    .scheduler
                    .schedule_after(local, period, TimerEvent::ThresholdTick);
            }
            TimerEvent::FeedbackSweep => {
                let _span = timer_span(local, "feedback_sweep").entered();
                let ttl = self.core.config.feedback.record_ttl();
                let unsent = self.core.to_send.sweep(ttl, now);
                let unreceived = self.core.to_receive.sweep(ttl, now);
                let forgotten = self.protocols.sweep_finished(ttl, now);
                self.core.feedback_seen.sweep(ttl, now);
                let chains = self.chain_results.sweep(ttl, now).len();
                let outcomes = self.request_outcomes.sweep(ttl, now).len();
                if !unsent.is_empty() || !unreceived.is_empty() {
                    info!(
                        unsent = unsent.len(),
                        unreceived = unreceived.len(),
                        forgotten,
                        "expired pending feedback"
                    );
                }
                debug!(chains, outcomes, "expired finished results");
                let period = self.core.config.feedback.sweep_period();
                self.core
                    .services
                    .scheduler
                    .schedule_after(local, period, TimerEvent::FeedbackSweep);
            }
        }
        self.settle();
    }

    // -- Local operations ----------------------------------------------------

    /// Ask `introducer` for one introduction toward `destination`.
    pub fn request_introduction(
        &mut self,
        introducer: Address,
        destination: Address,
    ) -> IntroductionRequest {
        let _span = introduction_span(self.core.local, introducer, destination).entered();
        let request = self
            .protocols
            .request_introduction(&mut self.core, introducer, destination);
        self.settle();
        request
    }

    /// Walk introductions from `introducer` toward `destination` and deliver
    /// `payload` there.
    ///
    /// Links opened only to reach the next introducer are released when the
    /// walk ends. The reference on the link the payload went out on is the
    /// caller's to [`release`](Self::release).
    pub fn send_via_chain(
        &mut self,
        introducer: Address,
        destination: Address,
        payload: Vec<u8>,
    ) -> ChainId {
        let _span = introduction_span(self.core.local, introducer, destination).entered();
        let chain = self
            .protocols
            .send_via_chain(&mut self.core, introducer, destination, payload);
        self.settle();
        chain
    }

    /// Send `payload` on the live link to `remote`.
    pub fn send_data(&mut self, remote: Address, payload: Vec<u8>) -> Result<(), NodeError> {
        let now = self.core.clock_now();
        let link = self
            .core
            .links
            .live_mut(&remote)
            .ok_or(NodeError::NoLink(remote))?;
        let result = link.send(Body::Data(payload), now);
        self.settle();
        result.map(|_| ()).map_err(NodeError::from)
    }

    /// Stop using `request` to justify its link, on both ends.
    pub fn release(&mut self, request: IntroductionRequest) -> Result<(), NodeError> {
        let links = &self.core.links;
        let remote = links
            .remotes()
            .find(|remote| links.get(&remote).is_some_and(|l| l.has_reference(&request)))
            .ok_or(NodeError::UnknownReference(request))?;
        self.core.release_reference(remote, request);
        self.settle();
        Ok(())
    }

    /// Report how the requester of `request` behaved, as its target.
    pub fn submit_feedback(
        &mut self,
        request: IntroductionRequest,
        kind: FeedbackKind,
    ) -> Result<(), NodeError> {
        let _span = feedback_span(self.core.local, &request).entered();
        let Some(record) = self.core.to_send.remove(&request) else {
            let e = NodeError::from(ProtocolFault::UnknownFeedback { request });
            self.note_error(&e);
            return Err(e);
        };
        info!(subject = %request.requester(), ?kind, to = %record.introducer, "submitting feedback");
        self.core.apply_feedback(&record.pedigree, kind);
        self.core
            .transmit(record.introducer, Body::Feedback { request, kind }, None);
        self.settle();
        Ok(())
    }

    // -- Internals -----------------------------------------------------------

    fn dispatch(&mut self, from: Address, body: Body) -> Result<(), NodeError> {
        if ProtocolRegistry::handles(&body) {
            return Ok(self.protocols.handle_message(&mut self.core, from, body)?);
        }
        match body {
            Body::Data(payload) => {
                debug!(bytes = payload.len(), "payload received");
                self.inbox.push((from, payload));
                Ok(())
            }
            Body::RemoveIntroductionReference { request } => {
                if let Some(link) = self.core.links.get_mut(&from) {
                    let removed = link.remove_reference(&request);
                    debug!(request = %request, removed, "peer released reference");
                }
                Ok(())
            }
            Body::Feedback { request, kind } => {
                Ok(self.core.receive_feedback(from, request, kind)?)
            }
            other => Err(ProtocolFault::Misrouted {
                kind: other.kind(),
                from,
            }
            .into()),
        }
    }

    /// Drain link effects, transmission outcomes and protocol events until
    /// none are left.
    fn settle(&mut self) {
        loop {
            let mut progressed = false;

            let remotes: Vec<Address> = self.core.links.remotes().collect();
            for remote in remotes {
                let effects = match self.core.links.get_mut(&remote) {
                    Some(link) => link.drain_effects(),
                    None => continue,
                };
                for effect in effects {
                    progressed = true;
                    self.on_link_effect(remote, effect);
                }
            }
            for remote in self.core.links.remove_closed() {
                debug!(node = %self.core.local, peer = %remote, "link removed");
            }

            for outcome in self.core.transmissions.drain_outcomes() {
                progressed = true;
                self.protocols.on_transmission(&mut self.core, &outcome);
            }

            for event in self.protocols.drain_events() {
                progressed = true;
                self.on_protocol_event(event);
            }

            if !progressed {
                break;
            }
        }
        self.core
            .metrics
            .open_links
            .set(self.core.links.live_count() as i64);
    }

    fn on_link_effect(&mut self, remote: Address, effect: LinkEffect) {
        match effect {
            LinkEffect::Acknowledged { seq } => {
                self.core.transmissions.on_acknowledged(remote, seq);
            }
            LinkEffect::ArmRetransmit { delay } => {
                self.core.services.scheduler.schedule_after(
                    self.core.local,
                    delay,
                    TimerEvent::Retransmit { remote },
                );
            }
            LinkEffect::Closed { forced } => {
                info!(node = %self.core.local, peer = %remote, forced, "link closed");
                let (table, mut port) = self.core.wrapper();
                table.on_link_closed(&mut port, remote);
            }
        }
    }

    fn on_protocol_event(&mut self, event: ProtocolEvent) {
        let metrics = &self.core.metrics;
        match event {
            ProtocolEvent::RequestStarted { request } => {
                metrics.introductions_requested.inc();
                debug!(request = %request, "introduction requested");
            }
            ProtocolEvent::RequestFinished { request, outcome } => {
                if outcome.is_success() {
                    metrics.introductions_completed.inc();
                } else {
                    metrics.introductions_denied.inc();
                }
                info!(request = %request, ?outcome, "introduction finished");
                self.request_outcomes.insert(request, outcome, self.core.clock_now());
            }
            ProtocolEvent::IntroductionBrokered { request, outcome } => {
                info!(request = %request, ?outcome, "introduction brokered");
            }
            ProtocolEvent::OfferDecided { request, outcome } => {
                match outcome {
                    TargetOutcome::Refused => metrics.offers_refused.inc(),
                    TargetOutcome::Created | TargetOutcome::Reused => metrics.offers_accepted.inc(),
                }
                info!(request = %request, ?outcome, "offer decided");
            }
            ProtocolEvent::ChainFinished { chain, result } => {
                if let ChainResult::Delivered { depth, .. } = result {
                    metrics.chain_hop_depth.observe(f64::from(depth));
                }
                info!(%chain, ?result, "chain finished");
                self.chain_results.insert(chain, result, self.core.clock_now());
            }
        }
    }

    fn note_error(&self, e: &NodeError) {
        if e.is_protocol_fault() {
            self.core.metrics.protocol_faults.inc();
            error!(node = %self.core.local, error = %e, "protocol fault");
        } else {
            warn!(node = %self.core.local, error = %e, "frame rejected");
        }
    }
}
