//! Reputation and the adaptive trust gate.
//!
//! Every node keeps a [`User`] record per peer it has vouched for or been
//! vouched to. The [`ReputationSystem`] admits a pedigree only when every
//! known identity in it scores above the current admission threshold, turns
//! feedback into attenuated score changes along the pedigree, and drives the
//! threshold with a [`ThresholdController`].
//!
//! The [`ledger`] module holds the per-node bookkeeping that routes feedback
//! back along an introduction chain.

pub mod config;
pub mod error;
pub mod ledger;
pub mod system;
pub mod threshold;
pub mod user;

pub use config::{ControllerConfig, ReputationConfig};
pub use error::ReputationError;
pub use ledger::{ExpiringLedger, IncomingFeedback, OutgoingFeedback, PedigreeBook};
pub use system::{feedback_delta, ReputationSystem, Verdict};
pub use threshold::ThresholdController;
pub use user::{User, MAX_SCORE};
