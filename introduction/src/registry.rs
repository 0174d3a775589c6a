//! The per-node registry of live protocol instances.
//!
//! Instances are keyed by their [`IntroductionRequest`]; a node learns which
//! role it plays from its position in the request. Terminal instances are
//! unregistered and remembered for a while so that late or retransmitted
//! messages for them are dropped instead of being reported as faults.

use std::collections::HashMap;
use std::time::Duration;

use vouch_messages::Body;
use vouch_reputation::ExpiringLedger;
use vouch_types::{Address, IntroductionRequest, Timestamp};

use crate::chain::ChainStep;
use crate::{
    ChainBuilder, ChainId, ChainResult, Introducer, IntroducerOutcome, ProtocolContext,
    ProtocolFault, Requester, RequesterOutcome, RoleKey, Target, TargetOutcome,
    TransmissionOutcome,
};

/// Something that happened in the protocol layer, for the node to log and
/// count.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProtocolEvent {
    RequestStarted {
        request: IntroductionRequest,
    },
    RequestFinished {
        request: IntroductionRequest,
        outcome: RequesterOutcome,
    },
    IntroductionBrokered {
        request: IntroductionRequest,
        outcome: IntroducerOutcome,
    },
    OfferDecided {
        request: IntroductionRequest,
        outcome: TargetOutcome,
    },
    ChainFinished {
        chain: ChainId,
        result: ChainResult,
    },
}

#[derive(Debug, Default)]
pub struct ProtocolRegistry {
    requesters: HashMap<IntroductionRequest, Requester>,
    introducers: HashMap<IntroductionRequest, Introducer>,
    chains: HashMap<ChainId, ChainBuilder>,
    next_chain: u64,
    finished: ExpiringLedger<()>,
    events: Vec<ProtocolEvent>,
}

impl ProtocolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `body` is handled by a protocol role rather than by the node.
    pub fn handles(body: &Body) -> bool {
        matches!(
            body,
            Body::IntroductionRequest { .. }
                | Body::IntroductionOffer { .. }
                | Body::IntroductionRefused { .. }
                | Body::IntroductionAccepted { .. }
                | Body::IntroductionCompleted { .. }
                | Body::IntroductionDenied { .. }
                | Body::IntroductionDeniedWillRoute { .. }
                | Body::AddIntroductionReference { .. }
        )
    }

    pub fn active_requesters(&self) -> usize {
        self.requesters.len()
    }

    pub fn active_introducers(&self) -> usize {
        self.introducers.len()
    }

    pub fn active_chains(&self) -> usize {
        self.chains.len()
    }

    pub fn is_registered(&self, request: &IntroductionRequest) -> bool {
        self.requesters.contains_key(request) || self.introducers.contains_key(request)
    }

    pub fn drain_events(&mut self) -> Vec<ProtocolEvent> {
        std::mem::take(&mut self.events)
    }

    // ---------------------------------------------------------------------
    // Initiation
    // ---------------------------------------------------------------------

    /// Ask `introducer` for a single introduction toward `destination`.
    pub fn request_introduction(
        &mut self,
        ctx: &mut dyn ProtocolContext,
        introducer: Address,
        destination: Address,
    ) -> IntroductionRequest {
        let request = ctx.new_request(introducer, destination);
        self.start_requester(ctx, Requester::new(request, None));
        request
    }

    /// Build a chain of introductions from `introducer` toward `destination`
    /// and deliver `payload` once it is reached.
    pub fn send_via_chain(
        &mut self,
        ctx: &mut dyn ProtocolContext,
        introducer: Address,
        destination: Address,
        payload: Vec<u8>,
    ) -> ChainId {
        self.next_chain += 1;
        let id = ChainId(self.next_chain);
        let mut chain = ChainBuilder::new(id, introducer, destination, payload);
        let step = chain.start(ctx);
        self.apply_chain_step(ctx, chain, step);
        id
    }

    fn start_requester(&mut self, ctx: &mut dyn ProtocolContext, requester: Requester) {
        let request = requester.request();
        requester.start(ctx);
        self.requesters.insert(request, requester);
        self.events.push(ProtocolEvent::RequestStarted { request });
    }

    fn apply_chain_step(&mut self, ctx: &mut dyn ProtocolContext, chain: ChainBuilder, step: ChainStep) {
        match step {
            ChainStep::Request(request) => {
                let id = chain.id();
                self.chains.insert(id, chain);
                self.start_requester(ctx, Requester::new(request, Some(id)));
            }
            ChainStep::Finished(result) => {
                self.events.push(ProtocolEvent::ChainFinished {
                    chain: chain.id(),
                    result,
                });
            }
        }
    }

    // ---------------------------------------------------------------------
    // Dispatch
    // ---------------------------------------------------------------------

    /// Route one accepted protocol message from `from` to its role instance.
    pub fn handle_message(
        &mut self,
        ctx: &mut dyn ProtocolContext,
        from: Address,
        body: Body,
    ) -> Result<(), ProtocolFault> {
        let kind = body.kind();
        let Some(request) = body.request().copied() else {
            return Err(ProtocolFault::Misrouted { kind, from });
        };
        let local = ctx.local();

        match body {
            Body::IntroductionRequest { .. } => {
                if request.introducer() != local {
                    return Err(ProtocolFault::Misrouted { kind, from });
                }
                if from != request.requester() {
                    return Err(ProtocolFault::SenderMismatch {
                        request,
                        kind,
                        expected: request.requester(),
                        actual: from,
                    });
                }
                if self.introducers.contains_key(&request) || self.finished.contains(&request) {
                    tracing::trace!(request = %request, "duplicate introduction request");
                    return Ok(());
                }
                let (introducer, outcome) = Introducer::start(ctx, request);
                match outcome {
                    Some(outcome) => self.finish_introducer(ctx, request, outcome),
                    None => {
                        self.introducers.insert(request, introducer);
                    }
                }
                Ok(())
            }
            Body::IntroductionOffer { pedigree, .. } => {
                if self.finished.contains(&request) {
                    tracing::trace!(request = %request, "duplicate offer");
                    return Ok(());
                }
                let outcome = Target::decide(ctx, from, request, pedigree)?;
                self.finished.insert(request, (), ctx.now());
                self.events
                    .push(ProtocolEvent::OfferDecided { request, outcome });
                Ok(())
            }
            Body::AddIntroductionReference { .. } if request.requester() == local => {
                self.requester_reply(ctx, from, request, body)
            }
            Body::IntroductionRefused { .. }
            | Body::IntroductionAccepted { .. }
            | Body::AddIntroductionReference { .. } => self.introducer_reply(ctx, from, request, body),
            Body::IntroductionCompleted { .. }
            | Body::IntroductionDenied { .. }
            | Body::IntroductionDeniedWillRoute { .. } => {
                self.requester_reply(ctx, from, request, body)
            }
            _ => Err(ProtocolFault::Misrouted { kind, from }),
        }
    }

    fn requester_reply(
        &mut self,
        ctx: &mut dyn ProtocolContext,
        from: Address,
        request: IntroductionRequest,
        body: Body,
    ) -> Result<(), ProtocolFault> {
        let kind = body.kind();
        let Some(requester) = self.requesters.remove(&request) else {
            return self.unregistered(request, kind);
        };
        match requester.on_message(ctx, from, body) {
            Ok(outcome) => {
                self.finish_requester(ctx, requester, outcome);
                Ok(())
            }
            Err(fault) => {
                self.requesters.insert(request, requester);
                Err(fault)
            }
        }
    }

    fn introducer_reply(
        &mut self,
        ctx: &mut dyn ProtocolContext,
        from: Address,
        request: IntroductionRequest,
        body: Body,
    ) -> Result<(), ProtocolFault> {
        let kind = body.kind();
        let Some(introducer) = self.introducers.remove(&request) else {
            return self.unregistered(request, kind);
        };
        match introducer.on_message(ctx, from, body) {
            Ok(outcome) => {
                self.finish_introducer(ctx, request, outcome);
                Ok(())
            }
            Err(fault) => {
                self.introducers.insert(request, introducer);
                Err(fault)
            }
        }
    }

    fn unregistered(
        &self,
        request: IntroductionRequest,
        kind: vouch_messages::MessageKind,
    ) -> Result<(), ProtocolFault> {
        if self.finished.contains(&request) {
            tracing::trace!(request = %request, %kind, "late message for finished introduction");
            return Ok(());
        }
        Err(ProtocolFault::UnregisteredProtocol { request, kind })
    }

    /// A bounded transmission finished. Only failures concern the owner.
    pub fn on_transmission(&mut self, ctx: &mut dyn ProtocolContext, outcome: &TransmissionOutcome) {
        if outcome.delivered {
            return;
        }
        match outcome.owner {
            Some(RoleKey::Requester(request)) => {
                if let Some(requester) = self.requesters.remove(&request) {
                    let result = requester.on_transmission_failed();
                    self.finish_requester(ctx, requester, result);
                }
            }
            Some(RoleKey::Introducer(request)) => {
                if let Some(introducer) = self.introducers.remove(&request) {
                    let result = introducer.on_transmission_failed(ctx);
                    self.finish_introducer(ctx, request, result);
                }
            }
            None => {}
        }
    }

    fn finish_requester(
        &mut self,
        ctx: &mut dyn ProtocolContext,
        requester: Requester,
        outcome: RequesterOutcome,
    ) {
        let request = requester.request();
        self.finished.insert(request, (), ctx.now());
        self.events.push(ProtocolEvent::RequestFinished {
            request,
            outcome: outcome.clone(),
        });

        let Some(id) = requester.chain() else {
            return;
        };
        if let Some(mut chain) = self.chains.remove(&id) {
            let step = chain.on_outcome(ctx, request, &outcome);
            self.apply_chain_step(ctx, chain, step);
        }
    }

    fn finish_introducer(
        &mut self,
        ctx: &mut dyn ProtocolContext,
        request: IntroductionRequest,
        outcome: IntroducerOutcome,
    ) {
        self.finished.insert(request, (), ctx.now());
        self.events
            .push(ProtocolEvent::IntroductionBrokered { request, outcome });
    }

    /// Forget finished introductions older than `ttl`.
    pub fn sweep_finished(&mut self, ttl: Duration, now: Timestamp) -> usize {
        self.finished.sweep(ttl, now).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockContext, I, R, T};
    use vouch_messages::{KeyMaterial, MessageKind};
    use vouch_types::{NonceSource, Pedigree};

    fn requester_side() -> (MockContext, ProtocolRegistry) {
        let mut ctx = MockContext::new(R);
        ctx.connect(I);
        (ctx, ProtocolRegistry::new())
    }

    fn completed(request: IntroductionRequest) -> Body {
        Body::IntroductionCompleted {
            request,
            neighbor: T,
            key: KeyMaterial(vec![1]),
        }
    }

    #[test]
    fn completion_unregisters_requester() {
        let (mut ctx, mut registry) = requester_side();
        let r = registry.request_introduction(&mut ctx, I, T);
        assert!(registry.is_registered(&r));

        registry.handle_message(&mut ctx, I, completed(r)).unwrap();
        assert!(!registry.is_registered(&r));
        let events = registry.drain_events();
        assert!(matches!(
            events.last(),
            Some(ProtocolEvent::RequestFinished { outcome: RequesterOutcome::Introduced { .. }, .. })
        ));
    }

    #[test]
    fn late_duplicate_is_ignored_but_unknown_is_a_fault() {
        let (mut ctx, mut registry) = requester_side();
        let r = registry.request_introduction(&mut ctx, I, T);
        registry.handle_message(&mut ctx, I, completed(r)).unwrap();
        assert!(registry.handle_message(&mut ctx, I, completed(r)).is_ok());

        let stranger = IntroductionRequest::new(&NonceSource::starting_at(500), R, I, T);
        let err = registry
            .handle_message(&mut ctx, I, Body::IntroductionDenied { request: stranger })
            .unwrap_err();
        assert_eq!(
            err,
            ProtocolFault::UnregisteredProtocol {
                request: stranger,
                kind: MessageKind::IntroductionDenied
            }
        );
    }

    #[test]
    fn fault_keeps_instance_registered() {
        let (mut ctx, mut registry) = requester_side();
        let r = registry.request_introduction(&mut ctx, I, T);
        assert!(registry.handle_message(&mut ctx, T, completed(r)).is_err());
        assert!(registry.is_registered(&r));
    }

    #[test]
    fn transmission_failure_exhausts_requester() {
        let (mut ctx, mut registry) = requester_side();
        let r = registry.request_introduction(&mut ctx, I, T);
        registry.drain_events();
        registry.on_transmission(
            &mut ctx,
            &TransmissionOutcome {
                id: 1,
                owner: Some(RoleKey::Requester(r)),
                destination: I,
                delivered: false,
            },
        );
        assert_eq!(
            registry.drain_events(),
            vec![ProtocolEvent::RequestFinished {
                request: r,
                outcome: RequesterOutcome::Exhausted
            }]
        );
    }

    #[test]
    fn introducer_lives_until_target_answers() {
        let mut ctx = MockContext::new(I);
        ctx.connect(R);
        ctx.connect(T);
        ctx.routes = vec![T];
        let mut registry = ProtocolRegistry::new();
        let r = IntroductionRequest::new(&NonceSource::new(), R, I, Address::new(40));

        registry
            .handle_message(&mut ctx, R, Body::IntroductionRequest { request: r })
            .unwrap();
        assert_eq!(registry.active_introducers(), 1);

        // Retransmitted request does not produce a second offer.
        registry
            .handle_message(&mut ctx, R, Body::IntroductionRequest { request: r })
            .unwrap();
        assert_eq!(ctx.sent_kinds(), vec![(T, MessageKind::IntroductionOffer)]);

        registry
            .handle_message(
                &mut ctx,
                T,
                Body::AddIntroductionReference {
                    request: r,
                    neighbor: T,
                },
            )
            .unwrap();
        assert_eq!(registry.active_introducers(), 0);
        assert_eq!(ctx.sent_kinds()[1], (R, MessageKind::AddIntroductionReference));
    }

    #[test]
    fn offer_is_decided_once() {
        let mut ctx = MockContext::new(T);
        ctx.connect(I);
        let mut registry = ProtocolRegistry::new();
        let r = IntroductionRequest::new(&NonceSource::new(), R, I, T);
        let offer = Body::IntroductionOffer {
            request: r,
            pedigree: Pedigree::new(R).get_next(r),
        };

        registry.handle_message(&mut ctx, I, offer.clone()).unwrap();
        registry.handle_message(&mut ctx, I, offer).unwrap();
        assert_eq!(ctx.created.len(), 1);
        assert_eq!(ctx.sent.len(), 1);
    }

    #[test]
    fn chain_drives_requesters_to_destination() {
        let (mut ctx, mut registry) = requester_side();
        let id = registry.send_via_chain(&mut ctx, I, T, b"payload".to_vec());
        assert_eq!(registry.active_chains(), 1);
        assert_eq!(registry.active_requesters(), 1);

        let Some(ProtocolEvent::RequestStarted { request }) = registry.drain_events().pop() else {
            panic!("expected a started request");
        };
        registry.handle_message(&mut ctx, I, completed(request)).unwrap();

        assert_eq!(registry.active_chains(), 0);
        assert!(registry.drain_events().contains(&ProtocolEvent::ChainFinished {
            chain: id,
            result: ChainResult::Delivered { to: T, depth: 1 }
        }));
        assert_eq!(ctx.data, vec![(T, b"payload".to_vec())]);
    }

    #[test]
    fn sweep_forgets_finished_requests() {
        let (mut ctx, mut registry) = requester_side();
        let r = registry.request_introduction(&mut ctx, I, T);
        registry.handle_message(&mut ctx, I, completed(r)).unwrap();

        let later = Timestamp::from_secs(3_600);
        assert_eq!(registry.sweep_finished(Duration::from_secs(60), later), 1);
        assert!(registry.handle_message(&mut ctx, I, completed(r)).is_err());
    }
}
