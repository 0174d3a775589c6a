//! Reputation tunables, loaded as the `[reputation]` table of the node config.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::ReputationError;

/// Gate and decay parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReputationConfig {
    /// Admission threshold before the controller first runs. Must be ≤ 0.
    #[serde(default = "default_initial_threshold")]
    pub initial_threshold: f64,

    /// Margin used when creating records for newly admitted identities.
    #[serde(default = "default_epsilon")]
    pub epsilon: f64,

    /// Time constant, in seconds, of the exponential decay of negative scores.
    #[serde(default = "default_fade_time_constant_secs")]
    pub fade_time_constant_secs: f64,

    /// Minimum spacing between two decay steps of the same record.
    #[serde(default = "default_min_fade_interval_ms")]
    pub min_fade_interval_ms: u64,

    #[serde(default)]
    pub controller: ControllerConfig,
}

fn default_initial_threshold() -> f64 {
    -0.1
}

fn default_epsilon() -> f64 {
    0.01
}

fn default_fade_time_constant_secs() -> f64 {
    3600.0
}

fn default_min_fade_interval_ms() -> u64 {
    1_000
}

impl Default for ReputationConfig {
    fn default() -> Self {
        Self {
            initial_threshold: default_initial_threshold(),
            epsilon: default_epsilon(),
            fade_time_constant_secs: default_fade_time_constant_secs(),
            min_fade_interval_ms: default_min_fade_interval_ms(),
            controller: ControllerConfig::default(),
        }
    }
}

impl ReputationConfig {
    pub fn min_fade_interval(&self) -> Duration {
        Duration::from_millis(self.min_fade_interval_ms)
    }

    /// Reject parameter combinations the gate or controller cannot run with.
    pub fn validate(&self) -> Result<(), ReputationError> {
        if self.initial_threshold > 0.0 {
            return Err(ReputationError::InvalidConfig(format!(
                "initial_threshold must be <= 0, got {}",
                self.initial_threshold
            )));
        }
        if self.epsilon <= 0.0 {
            return Err(ReputationError::InvalidConfig(
                "epsilon must be positive".into(),
            ));
        }
        if self.fade_time_constant_secs <= 0.0 {
            return Err(ReputationError::InvalidConfig(
                "fade_time_constant_secs must be positive".into(),
            ));
        }
        self.controller.validate()
    }
}

/// Parameters of the admission-threshold controller.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Health the controller steers toward, in `[0, 1]`.
    #[serde(default = "default_target_health")]
    pub target_health: f64,

    /// Smoothing factor of the health moving average, in `(0, 1]`.
    #[serde(default = "default_health_alpha")]
    pub health_alpha: f64,

    #[serde(default = "default_kp")]
    pub kp: f64,

    #[serde(default = "default_ki")]
    pub ki: f64,

    /// Anti-windup tracking time constant, in seconds.
    #[serde(default = "default_tracking_time_constant_secs")]
    pub tracking_time_constant_secs: f64,

    /// How far below the lowest known score the threshold may fall.
    #[serde(default = "default_headspace")]
    pub headspace: f64,

    /// Period of the scheduled threshold recomputation.
    #[serde(default = "default_tick_period_ms")]
    pub tick_period_ms: u64,
}

fn default_target_health() -> f64 {
    0.9
}

fn default_health_alpha() -> f64 {
    0.1
}

fn default_kp() -> f64 {
    0.5
}

fn default_ki() -> f64 {
    0.05
}

fn default_tracking_time_constant_secs() -> f64 {
    10.0
}

fn default_headspace() -> f64 {
    0.1
}

fn default_tick_period_ms() -> u64 {
    10_000
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            target_health: default_target_health(),
            health_alpha: default_health_alpha(),
            kp: default_kp(),
            ki: default_ki(),
            tracking_time_constant_secs: default_tracking_time_constant_secs(),
            headspace: default_headspace(),
            tick_period_ms: default_tick_period_ms(),
        }
    }
}

impl ControllerConfig {
    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_period_ms)
    }

    pub fn validate(&self) -> Result<(), ReputationError> {
        if !(0.0..=1.0).contains(&self.target_health) {
            return Err(ReputationError::InvalidConfig(format!(
                "target_health must be within [0, 1], got {}",
                self.target_health
            )));
        }
        if !(self.health_alpha > 0.0 && self.health_alpha <= 1.0) {
            return Err(ReputationError::InvalidConfig(format!(
                "health_alpha must be within (0, 1], got {}",
                self.health_alpha
            )));
        }
        if self.tracking_time_constant_secs <= 0.0 {
            return Err(ReputationError::InvalidConfig(
                "tracking_time_constant_secs must be positive".into(),
            ));
        }
        if self.headspace < 0.0 {
            return Err(ReputationError::InvalidConfig(
                "headspace must not be negative".into(),
            ));
        }
        if self.tick_period_ms == 0 {
            return Err(ReputationError::InvalidConfig(
                "tick_period_ms must be non-zero".into(),
            ));
        }
        Ok(())
    }
}
