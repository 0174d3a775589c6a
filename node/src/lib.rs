//! Vouch node: one actor per address tying together its links, the
//! introduction roles it plays and its reputation view of other nodes.
//!
//! The node never does I/O or reads the wall clock itself. Channels, timers,
//! routing and denial telemetry are collaborators injected through
//! [`NodeServices`]; the host feeds frames, channel notifications and timer
//! events back in as [`NodeEvent`]s.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod metrics;
pub mod node;
pub mod tracing_spans;

pub use config::{FeedbackConfig, LinkConfig, NodeConfig, TransmissionConfig};
pub use error::NodeError;
pub use events::NodeEvent;
pub use logging::{init_logging, LogFormat};
pub use metrics::NodeMetrics;
pub use node::{Node, NodeServices};
