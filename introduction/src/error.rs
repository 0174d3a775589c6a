use thiserror::Error;

use vouch_messages::MessageKind;
use vouch_types::{Address, IntroductionRequest};

/// A violated protocol invariant. Faults indicate a buggy or hostile peer
/// and are never part of a normal introduction outcome.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolFault {
    #[error("no protocol instance registered for {request} ({kind})")]
    UnregisteredProtocol {
        request: IntroductionRequest,
        kind: MessageKind,
    },

    #[error("offer for {request} carries a pedigree of {subject}")]
    SubjectMismatch {
        request: IntroductionRequest,
        subject: Address,
    },

    #[error("{kind} for {request} expected from {expected}, got {actual}")]
    SenderMismatch {
        request: IntroductionRequest,
        kind: MessageKind,
        expected: Address,
        actual: Address,
    },

    #[error("offered pedigree does not end at {request}")]
    PedigreeMismatch { request: IntroductionRequest },

    #[error("feedback for {request} matches no pending record")]
    UnknownFeedback { request: IntroductionRequest },

    #[error("traffic from {remote} on a closed link")]
    ClosedLinkTraffic { remote: Address },

    #[error("{kind} from {from} is not a protocol message for this node")]
    Misrouted { kind: MessageKind, from: Address },
}
