//! Reliable link transport between neighboring vouch nodes.
//!
//! A [`Link`] rides on a point-to-point [`Channel`] and adds what the
//! introduction protocol needs from its transport:
//! - per-link sequence numbers and a cumulative acknowledgment watermark
//!   (LCSNR, the last contiguous sequence number received),
//! - verbatim retransmission of stale unacknowledged messages,
//! - a `Nascent → Open → HalfClosed → Closed` lifecycle, with ephemeral links
//!   kept alive only while some introduction still references them.
//!
//! Links never call back into their owner. Everything the owner must act on
//! (acknowledged sequence numbers, timers to arm, closure) is queued as a
//! [`LinkEffect`] and drained by the owning node.

pub mod channel;
pub mod error;
pub mod link;
pub mod table;

pub use channel::{Channel, ChannelError, ChannelFactory};
pub use error::LinkError;
pub use link::{Link, LinkEffect, LinkState, Received};
pub use table::LinkTable;
