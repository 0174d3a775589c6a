//! Inputs a host hands to a [`Node`](crate::Node).

use vouch_types::{Address, TimerEvent};

/// One unit of work for the node actor. Each is processed to completion,
/// including every send it triggers, before the next.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeEvent {
    /// Bytes read from some channel.
    Frame(Vec<u8>),
    /// The channel opened toward `remote` can carry frames.
    ChannelReady { remote: Address },
    /// The channel toward `remote` failed.
    ChannelClosed { remote: Address },
    Timer(TimerEvent),
}
