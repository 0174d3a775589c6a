//! Wire message types for vouch node-to-node communication.
//!
//! Every frame on a link carries one [`Message`]: a routing envelope with the
//! transport's sequencing fields, wrapping a tagged [`Body`]. Dispatch on the
//! receiving side is an exhaustive `match` over the body, never a runtime
//! type test.

pub mod codec;
pub mod error;

pub use codec::{decode_message, encode_message, MAX_FRAME_SIZE};
pub use error::CodecError;

use serde::{Deserialize, Serialize};
use std::fmt;

use vouch_types::{Address, IntroductionRequest, Pedigree};

/// Envelope present on every frame.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub dst: Address,
    pub src: Address,
    /// Link sequence number; set on acknowledgable messages only.
    pub seq: Option<u64>,
    /// Sender's last contiguous sequence number received from us,
    /// piggybacked as a cumulative acknowledgment.
    pub lcsnr: Option<u64>,
    pub body: Body,
}

impl Message {
    /// A fresh envelope; the link fills in `seq` and `lcsnr` when sending.
    pub fn new(src: Address, dst: Address, body: Body) -> Self {
        Self {
            dst,
            src,
            seq: None,
            lcsnr: None,
            body,
        }
    }

    pub fn kind(&self) -> MessageKind {
        self.body.kind()
    }
}

/// Opaque keying material handed from target to requester. The protocol never
/// interprets it.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyMaterial(pub Vec<u8>);

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyMaterial({} bytes)", self.0.len())
    }
}

impl fmt::Display for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0))
    }
}

/// Verdict reported about a peer after it has used an introduction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeedbackKind {
    Bad,
    NotBad,
    Good,
    Noop,
}

/// Every message body exchanged between nodes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Body {
    /// Opaque application payload.
    Data(Vec<u8>),
    /// Requester asks an introducer for an introduction.
    IntroductionRequest { request: IntroductionRequest },
    /// Introducer offers the requester to a target, vouching with the
    /// requester's pedigree already extended by this request.
    IntroductionOffer {
        request: IntroductionRequest,
        pedigree: Pedigree,
    },
    /// Target declines the offer.
    IntroductionRefused { request: IntroductionRequest },
    /// Target accepts and has created a fresh link to the requester.
    IntroductionAccepted {
        request: IntroductionRequest,
        key: KeyMaterial,
    },
    /// Introducer tells the requester who its new neighbor is.
    IntroductionCompleted {
        request: IntroductionRequest,
        neighbor: Address,
        key: KeyMaterial,
    },
    /// Introducer refuses to introduce.
    IntroductionDenied { request: IntroductionRequest },
    /// Introducer refuses, but its existing link already routes to the
    /// destination.
    IntroductionDeniedWillRoute { request: IntroductionRequest },
    /// `request` now also justifies the existing link to `neighbor`.
    AddIntroductionReference {
        request: IntroductionRequest,
        neighbor: Address,
    },
    /// `request` no longer justifies the link it rides on.
    RemoveIntroductionReference { request: IntroductionRequest },
    /// Transport acknowledgment of sequence number `seq`.
    Acknowledge { seq: u64 },
    /// Bare acknowledgment; only the envelope's cumulative value matters.
    PlainAck,
    /// Verdict about the requester of `request`, travelling back up the chain.
    Feedback {
        request: IntroductionRequest,
        kind: FeedbackKind,
    },
}

impl Body {
    pub fn kind(&self) -> MessageKind {
        match self {
            Body::Data(_) => MessageKind::Data,
            Body::IntroductionRequest { .. } => MessageKind::IntroductionRequest,
            Body::IntroductionOffer { .. } => MessageKind::IntroductionOffer,
            Body::IntroductionRefused { .. } => MessageKind::IntroductionRefused,
            Body::IntroductionAccepted { .. } => MessageKind::IntroductionAccepted,
            Body::IntroductionCompleted { .. } => MessageKind::IntroductionCompleted,
            Body::IntroductionDenied { .. } => MessageKind::IntroductionDenied,
            Body::IntroductionDeniedWillRoute { .. } => MessageKind::IntroductionDeniedWillRoute,
            Body::AddIntroductionReference { .. } => MessageKind::AddIntroductionReference,
            Body::RemoveIntroductionReference { .. } => MessageKind::RemoveIntroductionReference,
            Body::Acknowledge { .. } => MessageKind::Acknowledge,
            Body::PlainAck => MessageKind::PlainAck,
            Body::Feedback { .. } => MessageKind::Feedback,
        }
    }

    /// The introduction this body refers to, if any.
    pub fn request(&self) -> Option<&IntroductionRequest> {
        match self {
            Body::IntroductionRequest { request }
            | Body::IntroductionOffer { request, .. }
            | Body::IntroductionRefused { request }
            | Body::IntroductionAccepted { request, .. }
            | Body::IntroductionCompleted { request, .. }
            | Body::IntroductionDenied { request }
            | Body::IntroductionDeniedWillRoute { request }
            | Body::AddIntroductionReference { request, .. }
            | Body::RemoveIntroductionReference { request }
            | Body::Feedback { request, .. } => Some(request),
            Body::Data(_) | Body::Acknowledge { .. } | Body::PlainAck => None,
        }
    }

    /// Whether the link sequences (and so retransmits) this body.
    pub fn is_acknowledgable(&self) -> bool {
        !matches!(self, Body::Acknowledge { .. } | Body::PlainAck)
    }
}

/// Tag of a [`Body`], used for dispatch tables, logs and metric labels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Data,
    IntroductionRequest,
    IntroductionOffer,
    IntroductionRefused,
    IntroductionAccepted,
    IntroductionCompleted,
    IntroductionDenied,
    IntroductionDeniedWillRoute,
    AddIntroductionReference,
    RemoveIntroductionReference,
    Acknowledge,
    PlainAck,
    Feedback,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Data => "data",
            MessageKind::IntroductionRequest => "introduction_request",
            MessageKind::IntroductionOffer => "introduction_offer",
            MessageKind::IntroductionRefused => "introduction_refused",
            MessageKind::IntroductionAccepted => "introduction_accepted",
            MessageKind::IntroductionCompleted => "introduction_completed",
            MessageKind::IntroductionDenied => "introduction_denied",
            MessageKind::IntroductionDeniedWillRoute => "introduction_denied_will_route",
            MessageKind::AddIntroductionReference => "add_introduction_reference",
            MessageKind::RemoveIntroductionReference => "remove_introduction_reference",
            MessageKind::Acknowledge => "acknowledge",
            MessageKind::PlainAck => "plain_ack",
            MessageKind::Feedback => "feedback",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
