//! Target role: decide whether to admit an offered requester.

use vouch_messages::{Body, KeyMaterial};
use vouch_reputation::OutgoingFeedback;
use vouch_types::{Address, IntroductionRequest, Pedigree};

use crate::{ProtocolContext, ProtocolFault};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TargetOutcome {
    /// A new ephemeral link to the requester was opened.
    Created,
    /// The existing link to the requester now also carries the request.
    Reused,
    Refused,
}

/// Keying material handed to the requester with a fresh link.
///
/// Key exchange is out of scope: this is an opaque token derived from the
/// request and the target, unique per introduction.
pub fn key_for(request: &IntroductionRequest, target: Address) -> KeyMaterial {
    let mut key = Vec::with_capacity(24);
    key.extend_from_slice(&request.nonce().as_u64().to_be_bytes());
    key.extend_from_slice(&request.requester().to_bytes());
    key.extend_from_slice(&target.to_bytes());
    KeyMaterial(key)
}

/// The target decides in a single step, so it keeps no state between
/// messages.
#[derive(Debug)]
pub struct Target;

impl Target {
    pub fn decide(
        ctx: &mut dyn ProtocolContext,
        from: Address,
        request: IntroductionRequest,
        pedigree: Pedigree,
    ) -> Result<TargetOutcome, ProtocolFault> {
        Self::validate(from, &request, &pedigree)?;

        let introducer = request.introducer();
        let requester = request.requester();

        let verdict = ctx.gate(&pedigree);
        if !verdict.is_accepted() {
            tracing::debug!(request = %request, ?verdict, "refusing offer");
            ctx.transmit(introducer, Body::IntroductionRefused { request }, None);
            return Ok(TargetOutcome::Refused);
        }

        ctx.owe_feedback(
            request,
            OutgoingFeedback {
                pedigree: pedigree.clone(),
                introducer,
            },
        );
        ctx.record_pedigree(pedigree);

        if ctx.has_live_link(requester) {
            ctx.add_link_reference(requester, request);
            tracing::debug!(request = %request, "offer accepted, reusing link");
            let neighbor = ctx.local();
            ctx.transmit(
                introducer,
                Body::AddIntroductionReference { request, neighbor },
                None,
            );
            Ok(TargetOutcome::Reused)
        } else {
            ctx.create_ephemeral_link(requester, request);
            tracing::debug!(request = %request, "offer accepted, opening link");
            let key = key_for(&request, ctx.local());
            ctx.transmit(introducer, Body::IntroductionAccepted { request, key }, None);
            Ok(TargetOutcome::Created)
        }
    }

    fn validate(
        from: Address,
        request: &IntroductionRequest,
        pedigree: &Pedigree,
    ) -> Result<(), ProtocolFault> {
        if pedigree.subject() != request.requester() {
            return Err(ProtocolFault::SubjectMismatch {
                request: *request,
                subject: pedigree.subject(),
            });
        }
        if from != request.introducer() {
            return Err(ProtocolFault::SenderMismatch {
                request: *request,
                kind: vouch_messages::MessageKind::IntroductionOffer,
                expected: request.introducer(),
                actual: from,
            });
        }
        if pedigree.last() != Some(request) {
            return Err(ProtocolFault::PedigreeMismatch { request: *request });
        }
        Ok(())
    }
}
