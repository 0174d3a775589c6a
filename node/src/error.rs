use thiserror::Error;

use vouch_introduction::ProtocolFault;
use vouch_types::{Address, IntroductionRequest};

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("config error: {0}")]
    Config(String),

    #[error("codec error: {0}")]
    Codec(#[from] vouch_messages::CodecError),

    #[error("link error: {0}")]
    Link(#[from] vouch_link::LinkError),

    #[error("protocol fault: {0}")]
    Protocol(#[from] ProtocolFault),

    #[error("reputation error: {0}")]
    Reputation(#[from] vouch_reputation::ReputationError),

    #[error("frame for {dst} delivered to {local}")]
    Misdelivered { dst: Address, local: Address },

    #[error("no live link to {0}")]
    NoLink(Address),

    #[error("no link carries {0} as a reference")]
    UnknownReference(IntroductionRequest),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl NodeError {
    /// Whether this error is an invariant violation by a peer.
    pub fn is_protocol_fault(&self) -> bool {
        matches!(self, NodeError::Protocol(_) | NodeError::Link(_))
    }
}
