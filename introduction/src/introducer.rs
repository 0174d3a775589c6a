//! Introducer role: vouch for a requester toward the next hop.

use vouch_messages::Body;
use vouch_reputation::IncomingFeedback;
use vouch_types::{Address, IntroductionRequest, Pedigree};

use crate::{ProtocolContext, ProtocolFault, RoleKey};

/// Upper bound on discovery alternates tried when picking a hop.
const MAX_HOP_CANDIDATES: usize = 8;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IntroducerOutcome {
    /// The requester now has a link to `target`.
    Completed { target: Address },
    /// This node routes to the destination itself.
    WillRoute,
    Denied,
}

#[derive(Debug)]
pub struct Introducer {
    request: IntroductionRequest,
    /// The requester's pedigree as stored here, before this request.
    pedigree: Pedigree,
    target: Option<Address>,
}

impl Introducer {
    /// Evaluate a fresh request. Returns the outcome when the decision is
    /// immediate; otherwise an offer is in flight and the instance must be
    /// kept until the target answers.
    pub fn start(
        ctx: &mut dyn ProtocolContext,
        request: IntroductionRequest,
    ) -> (Self, Option<IntroducerOutcome>) {
        let mut introducer = Self {
            request,
            pedigree: ctx.pedigree_of(request.requester()),
            target: None,
        };
        let outcome = introducer.decide(ctx);
        (introducer, outcome)
    }

    pub fn request(&self) -> IntroductionRequest {
        self.request
    }

    pub fn target(&self) -> Option<Address> {
        self.target
    }

    fn decide(&mut self, ctx: &mut dyn ProtocolContext) -> Option<IntroducerOutcome> {
        let verdict = ctx.gate(&self.pedigree);
        if !verdict.is_accepted() {
            tracing::debug!(request = %self.request, ?verdict, "requester failed the gate");
            return Some(self.deny(ctx));
        }

        let local = ctx.local();
        let destination = self.request.destination();
        if destination == local || ctx.proxy_for(destination) == Some(local) {
            tracing::debug!(request = %self.request, "destination is routed through this node");
            ctx.transmit(
                self.request.requester(),
                Body::IntroductionDeniedWillRoute {
                    request: self.request,
                },
                None,
            );
            return Some(IntroducerOutcome::WillRoute);
        }

        let Some(hop) = self.pick_hop(ctx) else {
            tracing::debug!(request = %self.request, "no usable hop toward destination");
            return Some(self.deny(ctx));
        };

        self.target = Some(hop);
        tracing::debug!(request = %self.request, target = %hop, "offering introduction");
        ctx.transmit(
            hop,
            Body::IntroductionOffer {
                request: self.request,
                pedigree: self.pedigree.get_next(self.request),
            },
            Some(RoleKey::Introducer(self.request)),
        );
        None
    }

    fn pick_hop(&self, ctx: &dyn ProtocolContext) -> Option<Address> {
        let destination = self.request.destination();
        (0..MAX_HOP_CANDIDATES)
            .map_while(|attempt| ctx.next_hop(destination, attempt))
            .find(|hop| *hop != self.request.requester() && ctx.has_live_link(*hop))
    }

    /// Handle the target's answer to our offer. Every answer is terminal.
    pub fn on_message(
        &self,
        ctx: &mut dyn ProtocolContext,
        from: Address,
        body: Body,
    ) -> Result<IntroducerOutcome, ProtocolFault> {
        let Some(target) = self.target else {
            return Err(ProtocolFault::Misrouted {
                kind: body.kind(),
                from,
            });
        };
        if from != target {
            return Err(ProtocolFault::SenderMismatch {
                request: self.request,
                kind: body.kind(),
                expected: target,
                actual: from,
            });
        }

        let requester = self.request.requester();
        match body {
            Body::IntroductionAccepted { key, .. } => {
                ctx.transmit(
                    requester,
                    Body::IntroductionCompleted {
                        request: self.request,
                        neighbor: target,
                        key,
                    },
                    None,
                );
                Ok(self.complete(ctx, target))
            }
            Body::AddIntroductionReference { .. } => {
                ctx.transmit(
                    requester,
                    Body::AddIntroductionReference {
                        request: self.request,
                        neighbor: target,
                    },
                    None,
                );
                Ok(self.complete(ctx, target))
            }
            Body::IntroductionRefused { .. } => {
                tracing::debug!(request = %self.request, target = %target, "target refused");
                Ok(self.deny(ctx))
            }
            other => Err(ProtocolFault::Misrouted {
                kind: other.kind(),
                from,
            }),
        }
    }

    /// The offer never reached the target.
    pub fn on_transmission_failed(&self, ctx: &mut dyn ProtocolContext) -> IntroducerOutcome {
        tracing::debug!(request = %self.request, target = ?self.target, "target unreachable");
        self.deny(ctx)
    }

    fn complete(&self, ctx: &mut dyn ProtocolContext, target: Address) -> IntroducerOutcome {
        ctx.expect_feedback(
            self.request,
            IncomingFeedback {
                pedigree: self.pedigree.get_next(self.request),
                prior: self.pedigree.last().copied(),
            },
        );
        IntroducerOutcome::Completed { target }
    }

    fn deny(&self, ctx: &mut dyn ProtocolContext) -> IntroducerOutcome {
        ctx.transmit(
            self.request.requester(),
            Body::IntroductionDenied {
                request: self.request,
            },
            None,
        );
        IntroducerOutcome::Denied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockContext, I, R, T};
    use vouch_messages::{KeyMaterial, MessageKind};
    use vouch_types::NonceSource;

    const D: Address = Address::new(40);

    fn setup(destination: Address) -> (MockContext, IntroductionRequest) {
        let mut ctx = MockContext::new(I);
        ctx.connect(R);
        ctx.connect(T);
        ctx.routes = vec![T];
        let request = IntroductionRequest::new(&NonceSource::new(), R, I, destination);
        (ctx, request)
    }

    #[test]
    fn offers_extended_pedigree_to_next_hop() {
        let (mut ctx, r) = setup(D);
        let (introducer, outcome) = Introducer::start(&mut ctx, r);
        assert!(outcome.is_none());
        assert_eq!(introducer.target(), Some(T));

        let (to, body, owner) = &ctx.sent[0];
        assert_eq!(*to, T);
        assert_eq!(*owner, Some(RoleKey::Introducer(r)));
        match body {
            Body::IntroductionOffer { pedigree, .. } => {
                assert_eq!(pedigree.subject(), R);
                assert_eq!(pedigree.last(), Some(&r));
            }
            other => panic!("expected offer, got {other:?}"),
        }
    }

    #[test]
    fn skips_requester_and_unlinked_hops() {
        let (mut ctx, r) = setup(D);
        ctx.routes = vec![R, Address::new(77), T];
        let (introducer, _) = Introducer::start(&mut ctx, r);
        assert_eq!(introducer.target(), Some(T));
    }

    #[test]
    fn no_hop_means_denial() {
        let (mut ctx, r) = setup(D);
        ctx.routes.clear();
        let (_, outcome) = Introducer::start(&mut ctx, r);
        assert_eq!(outcome, Some(IntroducerOutcome::Denied));
        assert_eq!(ctx.sent_kinds(), vec![(R, MessageKind::IntroductionDenied)]);
    }

    #[test]
    fn gate_rejection_means_denial() {
        let (mut ctx, r) = setup(D);
        ctx.reject_all = true;
        let (_, outcome) = Introducer::start(&mut ctx, r);
        assert_eq!(outcome, Some(IntroducerOutcome::Denied));
    }

    #[test]
    fn proxy_for_destination_routes_itself() {
        let (mut ctx, r) = setup(D);
        ctx.proxies.insert(D, I);
        let (_, outcome) = Introducer::start(&mut ctx, r);
        assert_eq!(outcome, Some(IntroducerOutcome::WillRoute));
        assert_eq!(
            ctx.sent_kinds(),
            vec![(R, MessageKind::IntroductionDeniedWillRoute)]
        );
    }

    #[test]
    fn acceptance_completes_and_expects_feedback() {
        let (mut ctx, r) = setup(D);
        let (introducer, _) = Introducer::start(&mut ctx, r);
        let outcome = introducer
            .on_message(
                &mut ctx,
                T,
                Body::IntroductionAccepted {
                    request: r,
                    key: KeyMaterial(vec![9]),
                },
            )
            .unwrap();
        assert_eq!(outcome, IntroducerOutcome::Completed { target: T });
        assert_eq!(ctx.sent_kinds()[1], (R, MessageKind::IntroductionCompleted));
        assert_eq!(ctx.expected.len(), 1);
        assert_eq!(ctx.expected[0].0, r);
        assert_eq!(ctx.expected[0].1.prior, None);
    }

    #[test]
    fn reuse_is_forwarded_to_requester() {
        let (mut ctx, r) = setup(D);
        let (introducer, _) = Introducer::start(&mut ctx, r);
        introducer
            .on_message(
                &mut ctx,
                T,
                Body::AddIntroductionReference {
                    request: r,
                    neighbor: T,
                },
            )
            .unwrap();
        match &ctx.sent[1] {
            (to, Body::AddIntroductionReference { neighbor, .. }, None) => {
                assert_eq!(*to, R);
                assert_eq!(*neighbor, T);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn refusal_and_failure_deny() {
        let (mut ctx, r) = setup(D);
        let (introducer, _) = Introducer::start(&mut ctx, r);
        let outcome = introducer
            .on_message(&mut ctx, T, Body::IntroductionRefused { request: r })
            .unwrap();
        assert_eq!(outcome, IntroducerOutcome::Denied);
        assert_eq!(introducer.on_transmission_failed(&mut ctx), IntroducerOutcome::Denied);
        assert!(ctx.expected.is_empty());
    }

    #[test]
    fn answer_from_non_target_is_a_fault() {
        let (mut ctx, r) = setup(D);
        let (introducer, _) = Introducer::start(&mut ctx, r);
        let err = introducer
            .on_message(&mut ctx, R, Body::IntroductionRefused { request: r })
            .unwrap_err();
        assert!(matches!(err, ProtocolFault::SenderMismatch { expected, .. } if expected == T));
    }
}
