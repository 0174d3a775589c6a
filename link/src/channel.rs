//! Underlying byte channel contract.
//!
//! The channel factory is a host collaborator: it creates the point-to-point
//! channel a link rides on and later reports connect/close events to the
//! owning node, which forwards them to the link.

use thiserror::Error;
use vouch_types::Address;

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("channel to {0} is closed")]
    Closed(Address),

    #[error("IO error: {0}")]
    Io(String),
}

/// A point-to-point frame channel to one remote node.
pub trait Channel: Send {
    /// Write one complete frame. Any error is fatal for the link.
    fn transmit(&mut self, frame: &[u8]) -> Result<(), ChannelError>;
}

/// Creates channels for new links.
pub trait ChannelFactory: Send + Sync {
    fn open(&self, local: Address, remote: Address) -> Box<dyn Channel>;
}
