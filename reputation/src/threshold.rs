//! Adaptive admission threshold.
//!
//! A PI controller with back-calculation anti-windup. Its process variable
//! is network "health": an exponential moving average of a sensor that reads
//! 0 for BAD feedback and 1 for anything else. When health falls below the
//! target the threshold rises toward 0 and admission gets stricter; when
//! health is good the threshold may fall as far as `headspace` below the
//! lowest known score.

use vouch_messages::FeedbackKind;
use vouch_types::Timestamp;

use crate::ControllerConfig;

#[derive(Clone, Debug)]
pub struct ThresholdController {
    params: ControllerConfig,
    threshold: f64,
    integrator: f64,
    actuator_error: f64,
    health: f64,
    last_update: Option<Timestamp>,
}

impl ThresholdController {
    /// The integrator starts at the initial threshold so the first update
    /// does not step away from it.
    pub fn new(params: ControllerConfig, initial_threshold: f64) -> Self {
        Self {
            params,
            threshold: initial_threshold,
            integrator: initial_threshold,
            actuator_error: 0.0,
            health: 1.0,
            last_update: None,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn health(&self) -> f64 {
        self.health
    }

    pub fn params(&self) -> &ControllerConfig {
        &self.params
    }

    /// Fold one feedback observation into the health average.
    pub fn observe(&mut self, kind: FeedbackKind) {
        let sensor = if kind == FeedbackKind::Bad { 0.0 } else { 1.0 };
        self.health += self.params.health_alpha * (sensor - self.health);
    }

    /// Recompute the threshold. `lowest_score` is the lowest score on record,
    /// or `None` when there are no records.
    pub fn update(&mut self, lowest_score: Option<f64>, now: Timestamp) -> f64 {
        let dt = self
            .last_update
            .map_or(0.0, |last| last.elapsed_since(now).as_secs_f64());
        self.last_update = Some(now);

        let health_error = self.params.target_health - self.health;
        self.integrator += (self.params.ki * health_error
            + self.actuator_error / self.params.tracking_time_constant_secs)
            * dt;
        let unconstrained = self.params.kp * health_error + self.integrator;

        let floor = (lowest_score.unwrap_or(0.0) - self.params.headspace).min(0.0);
        let clamped = unconstrained.clamp(floor, 0.0);
        self.actuator_error = clamped - unconstrained;

        if clamped != self.threshold {
            tracing::debug!(
                old = self.threshold,
                new = clamped,
                health = self.health,
                "admission threshold moved"
            );
        }
        self.threshold = clamped;
        clamped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> ThresholdController {
        ThresholdController::new(ControllerConfig::default(), -0.1)
    }

    fn secs(s: u64) -> Timestamp {
        Timestamp::from_secs(s)
    }

    #[test]
    fn health_tracks_feedback() {
        let mut c = controller();
        c.observe(FeedbackKind::Bad);
        assert!((c.health() - 0.9).abs() < 1e-12);
        c.observe(FeedbackKind::Good);
        assert!((c.health() - 0.91).abs() < 1e-12);
    }

    #[test]
    fn threshold_stays_within_bounds() {
        let mut c = controller();
        for _ in 0..50 {
            c.observe(FeedbackKind::Bad);
        }
        let mut t = 0;
        for _ in 0..100 {
            t += 10;
            let th = c.update(Some(-0.5), secs(t));
            assert!((-0.6..=0.0).contains(&th), "threshold {th} out of range");
        }
        // Sustained bad health pins the threshold at the strict end.
        assert_eq!(c.threshold(), 0.0);
    }

    #[test]
    fn good_health_lowers_threshold_to_floor() {
        let mut c = controller();
        let mut t = 0;
        for _ in 0..500 {
            t += 10;
            c.update(Some(-0.2), secs(t));
        }
        assert!((c.threshold() - -0.3).abs() < 1e-9);
    }

    #[test]
    fn no_records_floor_is_minus_headspace() {
        let mut c = controller();
        let mut t = 0;
        for _ in 0..500 {
            t += 10;
            c.update(None, secs(t));
        }
        assert!((c.threshold() - -0.1).abs() < 1e-9);
    }

    #[test]
    fn positive_lowest_score_still_caps_at_zero() {
        let mut c = controller();
        let th = c.update(Some(0.8), secs(1));
        assert!(th <= 0.0);
    }

    #[test]
    fn anti_windup_lets_threshold_recover_quickly() {
        let mut c = controller();
        for _ in 0..50 {
            c.observe(FeedbackKind::Bad);
        }
        let mut t = 0;
        for _ in 0..200 {
            t += 10;
            c.update(Some(-0.5), secs(t));
        }
        assert_eq!(c.threshold(), 0.0);

        for _ in 0..100 {
            c.observe(FeedbackKind::Good);
        }
        // Without back-calculation the integrator would have wound far past
        // zero and the threshold would stay pinned for a long time.
        let mut recovered = false;
        for _ in 0..20 {
            t += 10;
            if c.update(Some(-0.5), secs(t)) < 0.0 {
                recovered = true;
                break;
            }
        }
        assert!(recovered);
    }

    #[test]
    fn first_update_does_not_integrate() {
        let mut c = controller();
        // health 1.0, target 0.9: kp * -0.1 + integrator(-0.1)
        let th = c.update(Some(-1.0), secs(5));
        assert!((th - (-0.05 - 0.1)).abs() < 1e-12);
    }
}
