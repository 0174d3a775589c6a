//! The introduction protocol suite.
//!
//! Three roles cooperate on one [`IntroductionRequest`]:
//! - the [`Requester`] asks a neighbor to introduce it toward a destination,
//! - the [`Introducer`] vets the requester's pedigree and offers it to the
//!   next hop,
//! - the [`Target`] decides whether to admit the requester and either opens a
//!   new ephemeral link or reuses an existing one.
//!
//! A [`ChainBuilder`] repeats the requester role hop by hop until it holds a
//! link to the destination, then delivers a pending payload.
//!
//! Role instances live in the node's [`ProtocolRegistry`]. They never touch
//! node state directly: everything they need (links, the trust gate, route
//! discovery, outgoing messages) goes through [`ProtocolContext`]. Control
//! messages are sent through the bounded [`transmission`] wrapper, whose
//! failures come back to the owning role.
//!
//! [`IntroductionRequest`]: vouch_types::IntroductionRequest

pub mod chain;
pub mod context;
pub mod discovery;
pub mod error;
pub mod introducer;
pub mod registry;
pub mod requester;
pub mod target;
pub mod transmission;

#[cfg(test)]
pub(crate) mod testing;

pub use chain::{ChainBuilder, ChainId, ChainResult};
pub use context::{ProtocolContext, RoleKey};
pub use discovery::{DenialSink, Discovery};
pub use error::ProtocolFault;
pub use introducer::{Introducer, IntroducerOutcome};
pub use registry::{ProtocolEvent, ProtocolRegistry};
pub use requester::{Requester, RequesterOutcome};
pub use target::{key_for, Target, TargetOutcome};
pub use transmission::{TransmissionOutcome, TransmissionPort, TransmissionTable};
