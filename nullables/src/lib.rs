//! Nullable infrastructure for deterministic testing.
//!
//! Every host collaborator a node talks to (clock, timer scheduler, byte
//! channels, route discovery, denial telemetry) is abstracted behind a trait.
//! This crate provides test-friendly implementations that:
//! - Return deterministic values
//! - Can be controlled programmatically
//! - Never touch real sockets or wall-clock time
//!
//! They are all cheap to share: tests hold one handle and give the node an
//! `Arc` of the same value, then drive time and traffic by hand.

pub mod clock;
pub mod discovery;
pub mod network;
pub mod scheduler;

pub use clock::NullClock;
pub use discovery::{NullDenialSink, NullDiscovery};
pub use network::{NullNetwork, WireEvent};
pub use scheduler::NullScheduler;
