use thiserror::Error;

use vouch_messages::{CodecError, MessageKind};
use vouch_types::Address;

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("link to {remote} is closed")]
    Closed { remote: Address },

    #[error("traffic from {remote} arrived on a closed link")]
    ClosedLinkTraffic { remote: Address },

    #[error("{kind} from {remote} carries no sequence number")]
    Unsequenced { remote: Address, kind: MessageKind },

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
}
