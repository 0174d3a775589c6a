//! Per-identity reputation record.

use std::time::Duration;

use vouch_types::{Address, Timestamp};

/// Upper bound on any score. There is no lower bound.
pub const MAX_SCORE: f64 = 1.0;

/// Reputation held about one identity.
#[derive(Clone, Debug, PartialEq)]
pub struct User {
    identity: Address,
    score: f64,
    created_at: Timestamp,
    last_feedback: Option<Timestamp>,
    last_fade: Timestamp,
}

impl User {
    pub fn new(identity: Address, score: f64, now: Timestamp) -> Self {
        Self {
            identity,
            score: score.min(MAX_SCORE),
            created_at: now,
            last_feedback: None,
            last_fade: now,
        }
    }

    pub fn identity(&self) -> Address {
        self.identity
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn last_feedback(&self) -> Option<Timestamp> {
        self.last_feedback
    }

    /// Decay a negative score toward zero.
    ///
    /// Non-negative scores never decay; their decay clock is kept at `now` so
    /// a later drop below zero starts decaying from that moment.
    pub fn fade(&mut self, now: Timestamp, time_constant_secs: f64, min_interval: Duration) {
        if self.score >= 0.0 {
            self.last_fade = now;
            return;
        }
        let elapsed = self.last_fade.elapsed_since(now);
        if elapsed < min_interval {
            return;
        }
        self.score *= (-elapsed.as_secs_f64() / time_constant_secs).exp();
        self.last_fade = now;
    }

    /// Apply a feedback delta, capped at [`MAX_SCORE`].
    pub fn adjust(&mut self, delta: f64, now: Timestamp) {
        self.score = (self.score + delta).min(MAX_SCORE);
        self.last_feedback = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TAU: f64 = 100.0;
    const MIN_INTERVAL: Duration = Duration::from_secs(1);

    fn user(score: f64) -> User {
        User::new(Address::new(1), score, Timestamp::EPOCH)
    }

    #[test]
    fn negative_score_decays_toward_zero() {
        let mut u = user(-1.0);
        u.fade(Timestamp::from_secs(100), TAU, MIN_INTERVAL);
        let expected = -(-1.0f64).exp();
        assert!((u.score() - expected).abs() < 1e-9);
        assert!(u.score() < 0.0);
    }

    #[test]
    fn positive_score_never_decays() {
        let mut u = user(0.5);
        u.fade(Timestamp::from_secs(10_000), TAU, MIN_INTERVAL);
        assert_eq!(u.score(), 0.5);
    }

    #[test]
    fn fade_is_gated_by_min_interval() {
        let mut u = user(-1.0);
        u.fade(Timestamp::from_millis(500), TAU, MIN_INTERVAL);
        assert_eq!(u.score(), -1.0);
    }

    #[test]
    fn decay_clock_restarts_after_going_negative() {
        let mut u = user(0.2);
        u.fade(Timestamp::from_secs(1_000), TAU, MIN_INTERVAL);
        u.adjust(-1.2, Timestamp::from_secs(1_000));
        // Only the time spent negative counts.
        u.fade(Timestamp::from_secs(1_100), TAU, MIN_INTERVAL);
        let expected = -(-1.0f64).exp();
        assert!((u.score() - expected).abs() < 1e-9);
    }

    #[test]
    fn adjust_caps_at_max_score() {
        let mut u = user(0.95);
        u.adjust(0.1, Timestamp::from_secs(1));
        assert_eq!(u.score(), MAX_SCORE);
        assert_eq!(u.last_feedback(), Some(Timestamp::from_secs(1)));
    }

    #[test]
    fn creation_is_capped() {
        assert_eq!(user(3.0).score(), MAX_SCORE);
    }
}
