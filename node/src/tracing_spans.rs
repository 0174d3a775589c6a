//! Pre-built [`tracing::Span`] constructors for node operations.
//!
//! Consistent span names and fields make it easy to follow one frame or one
//! introduction through the logs of several nodes.

use tracing::{info_span, Span};

use vouch_messages::MessageKind;
use vouch_types::{Address, IntroductionRequest};

/// Handling of one inbound frame.
pub fn frame_recv_span(local: Address, peer: Address, kind: MessageKind) -> Span {
    info_span!("frame_recv", node = %local, peer = %peer, kind = %kind)
}

/// A locally initiated introduction or chain.
pub fn introduction_span(local: Address, introducer: Address, destination: Address) -> Span {
    info_span!("introduction", node = %local, introducer = %introducer, destination = %destination)
}

/// Feedback being applied or forwarded.
pub fn feedback_span(local: Address, request: &IntroductionRequest) -> Span {
    info_span!("feedback", node = %local, request = %request)
}

/// A timer firing.
pub fn timer_span(local: Address, event: &str) -> Span {
    info_span!("timer", node = %local, event = %event)
}
