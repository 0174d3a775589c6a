//! Fundamental types for the vouch introduction protocol.
//!
//! This crate defines the value types shared across every other crate in the
//! workspace: node addresses, introduction requests and their nonces,
//! pedigrees, timestamps, and the clock/scheduler contracts a host provides.

pub mod address;
pub mod error;
pub mod pedigree;
pub mod request;
pub mod time;

pub use address::Address;
pub use error::TypesError;
pub use pedigree::Pedigree;
pub use request::{IntroductionRequest, Nonce, NonceSource};
pub use time::{Clock, Scheduler, SystemClock, TimerEvent, Timestamp};
