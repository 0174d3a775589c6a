//! Multi-hop chain building: walk introductions toward a destination and
//! deliver a payload once a link to it exists.

use std::fmt;

use vouch_types::{Address, IntroductionRequest};

use crate::{ProtocolContext, RequesterOutcome};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChainId(pub u64);

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "chain-{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChainResult {
    /// The payload went out to `to` after `depth` handshakes.
    Delivered { to: Address, depth: u32 },
    Failed { depth: u32 },
}

/// What the registry must do after a chain step.
#[derive(Debug, PartialEq, Eq)]
pub enum ChainStep {
    /// Run a requester for this request.
    Request(IntroductionRequest),
    Finished(ChainResult),
}

#[derive(Debug)]
pub struct ChainBuilder {
    id: ChainId,
    destination: Address,
    payload: Vec<u8>,
    introducer: Address,
    depth: u32,
    /// The request justifying our link to the current introducer. `None`
    /// while the introducer is an a-priori neighbor.
    held: Option<IntroductionRequest>,
}

impl ChainBuilder {
    pub fn new(id: ChainId, introducer: Address, destination: Address, payload: Vec<u8>) -> Self {
        Self {
            id,
            destination,
            payload,
            introducer,
            depth: 0,
            held: None,
        }
    }

    pub fn id(&self) -> ChainId {
        self.id
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn start(&mut self, ctx: &mut dyn ProtocolContext) -> ChainStep {
        if ctx.has_live_link(self.destination) {
            return self.deliver(ctx, self.destination);
        }
        self.depth = 1;
        ChainStep::Request(ctx.new_request(self.introducer, self.destination))
    }

    /// Advance after the current handshake for `request` finished.
    pub fn on_outcome(
        &mut self,
        ctx: &mut dyn ProtocolContext,
        request: IntroductionRequest,
        outcome: &RequesterOutcome,
    ) -> ChainStep {
        match outcome {
            RequesterOutcome::Introduced { neighbor, .. } if *neighbor == self.destination => {
                self.deliver(ctx, *neighbor)
            }
            RequesterOutcome::Introduced { neighbor, .. } => {
                if let Some(previous) = self.held.replace(request) {
                    ctx.release_reference(self.introducer, previous);
                }
                tracing::debug!(
                    chain = %self.id,
                    from = %self.introducer,
                    to = %neighbor,
                    depth = self.depth + 1,
                    "chain advancing"
                );
                self.introducer = *neighbor;
                self.depth += 1;
                ChainStep::Request(ctx.new_request(self.introducer, self.destination))
            }
            RequesterOutcome::Routed { via } => self.deliver(ctx, *via),
            RequesterOutcome::Denied | RequesterOutcome::Exhausted => {
                tracing::debug!(chain = %self.id, depth = self.depth, ?outcome, "chain failed");
                ctx.denied_at_depth(self.depth);
                self.finish(ctx, ChainResult::Failed { depth: self.depth })
            }
        }
    }

    fn deliver(&mut self, ctx: &mut dyn ProtocolContext, to: Address) -> ChainStep {
        tracing::debug!(chain = %self.id, to = %to, depth = self.depth, "delivering payload");
        ctx.send_data(to, std::mem::take(&mut self.payload));
        self.finish(
            ctx,
            ChainResult::Delivered {
                to,
                depth: self.depth,
            },
        )
    }

    /// The link to the last intermediate introducer only served the walk.
    /// Payload already queued on it still drains before it closes.
    fn finish(&mut self, ctx: &mut dyn ProtocolContext, result: ChainResult) -> ChainStep {
        if let Some(held) = self.held.take() {
            ctx.release_reference(self.introducer, held);
        }
        ChainStep::Finished(result)
    }
}
