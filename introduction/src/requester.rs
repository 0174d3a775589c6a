//! Requester role: ask a neighbor for an introduction and act on the answer.

use vouch_messages::{Body, KeyMaterial};
use vouch_types::{Address, IntroductionRequest};

use crate::{ChainId, ProtocolContext, ProtocolFault, RoleKey};

/// How a requester's handshake ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RequesterOutcome {
    /// A link to `neighbor` now carries the request as a reference. `key` is
    /// absent when an existing link was reused.
    Introduced {
        neighbor: Address,
        key: Option<KeyMaterial>,
    },
    /// The introducer already routes to the destination.
    Routed { via: Address },
    Denied,
    /// The introducer never acknowledged the request.
    Exhausted,
}

impl RequesterOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Introduced { .. } | Self::Routed { .. })
    }
}

#[derive(Debug)]
pub struct Requester {
    request: IntroductionRequest,
    chain: Option<ChainId>,
}

impl Requester {
    pub fn new(request: IntroductionRequest, chain: Option<ChainId>) -> Self {
        Self { request, chain }
    }

    pub fn request(&self) -> IntroductionRequest {
        self.request
    }

    pub fn chain(&self) -> Option<ChainId> {
        self.chain
    }

    pub fn start(&self, ctx: &mut dyn ProtocolContext) {
        tracing::debug!(request = %self.request, "requesting introduction");
        ctx.transmit(
            self.request.introducer(),
            Body::IntroductionRequest {
                request: self.request,
            },
            Some(RoleKey::Requester(self.request)),
        );
    }

    /// Handle the introducer's answer. Every answer is terminal.
    pub fn on_message(
        &self,
        ctx: &mut dyn ProtocolContext,
        from: Address,
        body: Body,
    ) -> Result<RequesterOutcome, ProtocolFault> {
        let introducer = self.request.introducer();
        if from != introducer {
            return Err(ProtocolFault::SenderMismatch {
                request: self.request,
                kind: body.kind(),
                expected: introducer,
                actual: from,
            });
        }

        let outcome = match body {
            Body::IntroductionCompleted { neighbor, key, .. } => {
                self.establish(ctx, neighbor);
                RequesterOutcome::Introduced {
                    neighbor,
                    key: Some(key),
                }
            }
            Body::AddIntroductionReference { neighbor, .. } => {
                self.establish(ctx, neighbor);
                RequesterOutcome::Introduced {
                    neighbor,
                    key: None,
                }
            }
            Body::IntroductionDenied { .. } => RequesterOutcome::Denied,
            Body::IntroductionDeniedWillRoute { .. } => RequesterOutcome::Routed { via: introducer },
            other => {
                return Err(ProtocolFault::Misrouted {
                    kind: other.kind(),
                    from,
                })
            }
        };
        tracing::debug!(request = %self.request, ?outcome, "introduction answered");
        Ok(outcome)
    }

    /// The request never got through to the introducer.
    pub fn on_transmission_failed(&self) -> RequesterOutcome {
        tracing::debug!(request = %self.request, "introducer unreachable");
        RequesterOutcome::Exhausted
    }

    fn establish(&self, ctx: &mut dyn ProtocolContext, neighbor: Address) {
        if ctx.has_live_link(neighbor) {
            ctx.add_link_reference(neighbor, self.request);
        } else {
            ctx.create_ephemeral_link(neighbor, self.request);
        }
    }
}
