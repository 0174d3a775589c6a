//! Node configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use vouch_reputation::ReputationConfig;

use crate::{LogFormat, NodeError};

/// Configuration for a vouch node.
///
/// Every field has a default, so an empty file is a valid configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter, e.g. "info" or "debug,vouch_link=trace".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub link: LinkConfig,

    #[serde(default)]
    pub transmission: TransmissionConfig,

    #[serde(default)]
    pub reputation: ReputationConfig,

    #[serde(default)]
    pub feedback: FeedbackConfig,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkConfig {
    /// How long an unacknowledged message waits before it is re-sent.
    #[serde(default = "default_retransmit_timeout_ms")]
    pub retransmit_timeout_ms: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransmissionConfig {
    /// Per-attempt acknowledgment deadline for protocol messages.
    #[serde(default = "default_ack_timeout_ms")]
    pub ack_timeout_ms: u64,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u8,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackConfig {
    /// Pending-feedback records older than this are dropped.
    #[serde(default = "default_record_ttl_secs")]
    pub record_ttl_secs: u64,

    #[serde(default = "default_sweep_period_secs")]
    pub sweep_period_secs: u64,
}

// ── Defaults ───────────────────────────────────────────────────────────

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_retransmit_timeout_ms() -> u64 {
    500
}

fn default_ack_timeout_ms() -> u64 {
    1_000
}

fn default_max_attempts() -> u8 {
    vouch_introduction::transmission::DEFAULT_MAX_ATTEMPTS
}

fn default_record_ttl_secs() -> u64 {
    600
}

fn default_sweep_period_secs() -> u64 {
    60
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            retransmit_timeout_ms: default_retransmit_timeout_ms(),
        }
    }
}

impl Default for TransmissionConfig {
    fn default() -> Self {
        Self {
            ack_timeout_ms: default_ack_timeout_ms(),
            max_attempts: default_max_attempts(),
        }
    }
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            record_ttl_secs: default_record_ttl_secs(),
            sweep_period_secs: default_sweep_period_secs(),
        }
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            log_format: default_log_format(),
            log_level: default_log_level(),
            link: LinkConfig::default(),
            transmission: TransmissionConfig::default(),
            reputation: ReputationConfig::default(),
            feedback: FeedbackConfig::default(),
        }
    }
}

// ── Impl ───────────────────────────────────────────────────────────────

impl LinkConfig {
    pub fn retransmit_timeout(&self) -> Duration {
        Duration::from_millis(self.retransmit_timeout_ms)
    }
}

impl TransmissionConfig {
    pub fn ack_timeout(&self) -> Duration {
        Duration::from_millis(self.ack_timeout_ms)
    }
}

impl FeedbackConfig {
    pub fn record_ttl(&self) -> Duration {
        Duration::from_secs(self.record_ttl_secs)
    }

    pub fn sweep_period(&self) -> Duration {
        Duration::from_secs(self.sweep_period_secs)
    }
}

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &str) -> Result<Self, NodeError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| NodeError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        let config: Self = toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> String {
        toml::to_string_pretty(self).expect("NodeConfig is always serializable to TOML")
    }

    pub fn validate(&self) -> Result<(), NodeError> {
        self.log_format()?;
        if self.link.retransmit_timeout_ms == 0 {
            return Err(NodeError::Config("link.retransmit_timeout_ms must be positive".into()));
        }
        if self.transmission.ack_timeout_ms == 0 {
            return Err(NodeError::Config("transmission.ack_timeout_ms must be positive".into()));
        }
        if self.transmission.max_attempts == 0 {
            return Err(NodeError::Config("transmission.max_attempts must be at least 1".into()));
        }
        if self.feedback.sweep_period_secs == 0 {
            return Err(NodeError::Config("feedback.sweep_period_secs must be positive".into()));
        }
        self.reputation
            .validate()
            .map_err(|e| NodeError::Config(e.to_string()))
    }

    pub fn log_format(&self) -> Result<LogFormat, NodeError> {
        self.log_format.parse()
    }
}
