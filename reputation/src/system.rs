//! The trust gate and feedback application.

use std::collections::HashMap;

use vouch_messages::FeedbackKind;
use vouch_types::{Address, Pedigree, Timestamp};

use crate::{ReputationConfig, ThresholdController, User};

/// Score change carried by each kind of feedback.
pub fn feedback_delta(kind: FeedbackKind) -> f64 {
    match kind {
        FeedbackKind::Bad => -1.0,
        FeedbackKind::NotBad => 0.0,
        FeedbackKind::Good => 0.1,
        FeedbackKind::Noop => 0.0,
    }
}

/// Outcome of running a pedigree through the gate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Verdict {
    Accepted { min_reputation: f64 },
    Rejected { min_reputation: f64, threshold: f64 },
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }
}

/// One node's view of everyone's reputation.
#[derive(Debug)]
pub struct ReputationSystem {
    config: ReputationConfig,
    users: HashMap<Address, User>,
    controller: ThresholdController,
}

impl ReputationSystem {
    pub fn new(config: ReputationConfig) -> Self {
        let controller =
            ThresholdController::new(config.controller.clone(), config.initial_threshold);
        Self {
            config,
            users: HashMap::new(),
            controller,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.controller.threshold()
    }

    pub fn health(&self) -> f64 {
        self.controller.health()
    }

    pub fn config(&self) -> &ReputationConfig {
        &self.config
    }

    pub fn user(&self, identity: &Address) -> Option<&User> {
        self.users.get(identity)
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    /// Current score of `identity` after decay, if it has a record.
    pub fn score(&mut self, identity: &Address, now: Timestamp) -> Option<f64> {
        self.faded(identity, now).map(|user| user.score())
    }

    /// Lowest score on record after decay, `None` when there are no records.
    pub fn lowest_score(&mut self, now: Timestamp) -> Option<f64> {
        let tau = self.config.fade_time_constant_secs;
        let min_interval = self.config.min_fade_interval();
        self.users
            .values_mut()
            .map(|user| {
                user.fade(now, tau, min_interval);
                user.score()
            })
            .reduce(f64::min)
    }

    fn faded(&mut self, identity: &Address, now: Timestamp) -> Option<&mut User> {
        let tau = self.config.fade_time_constant_secs;
        let min_interval = self.config.min_fade_interval();
        self.users.get_mut(identity).map(|user| {
            user.fade(now, tau, min_interval);
            user
        })
    }

    // ---------------------------------------------------------------------
    // Gate
    // ---------------------------------------------------------------------

    /// Decide whether to extend trust to the subject of `pedigree`.
    ///
    /// The minimum reputation starts from the subject's score (0 when the
    /// subject has no record) and takes in every introducer that has one;
    /// introducers without a record are skipped. Admission requires the
    /// minimum to be strictly above the threshold. Only an admission creates
    /// records for the identities that lacked one.
    pub fn accept(&mut self, pedigree: &Pedigree, now: Timestamp) -> Verdict {
        let subject = pedigree.subject();
        let mut min_reputation = self.score(&subject, now).unwrap_or(0.0);
        for introducer in pedigree.introducers() {
            if let Some(score) = self.score(&introducer, now) {
                min_reputation = min_reputation.min(score);
            }
        }

        let threshold = self.threshold();
        if min_reputation <= threshold {
            tracing::debug!(
                subject = %subject,
                min_reputation,
                threshold,
                "pedigree rejected"
            );
            return Verdict::Rejected {
                min_reputation,
                threshold,
            };
        }

        let initial = (min_reputation - self.config.epsilon).max(threshold + self.config.epsilon);
        let identities = std::iter::once(subject).chain(pedigree.introducers());
        for identity in identities {
            self.users.entry(identity).or_insert_with(|| {
                tracing::trace!(identity = %identity, score = initial, "reputation record created");
                User::new(identity, initial, now)
            });
        }
        Verdict::Accepted { min_reputation }
    }

    // ---------------------------------------------------------------------
    // Feedback
    // ---------------------------------------------------------------------

    /// Apply feedback about the subject of `pedigree`.
    ///
    /// The subject takes the full delta. The introducer of the most recent
    /// request takes a quarter of it, the one before a sixteenth, and so on
    /// back along the chain. Identities without a record are left alone.
    /// BAD feedback also triggers an immediate threshold update.
    ///
    /// Returns the number of records changed.
    pub fn apply_feedback(&mut self, pedigree: &Pedigree, kind: FeedbackKind, now: Timestamp) -> usize {
        let delta = feedback_delta(kind);
        let mut updated = 0;

        updated += usize::from(self.adjust(&pedigree.subject(), delta, now));
        let mut share = delta;
        for introducer in pedigree.introducers() {
            share /= 4.0;
            updated += usize::from(self.adjust(&introducer, share, now));
        }

        self.controller.observe(kind);
        if kind == FeedbackKind::Bad {
            self.update_threshold(now);
        }
        updated
    }

    fn adjust(&mut self, identity: &Address, delta: f64, now: Timestamp) -> bool {
        match self.faded(identity, now) {
            Some(user) => {
                user.adjust(delta, now);
                true
            }
            None => {
                tracing::debug!(identity = %identity, "feedback for unrecorded identity ignored");
                false
            }
        }
    }

    /// Run one controller step against the current lowest score.
    pub fn update_threshold(&mut self, now: Timestamp) -> f64 {
        let lowest = self.lowest_score(now);
        self.controller.update(lowest, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vouch_types::{IntroductionRequest, NonceSource};

    const A: Address = Address::new(1);
    const B: Address = Address::new(2);
    const C: Address = Address::new(3);
    const S: Address = Address::new(10);

    fn now() -> Timestamp {
        Timestamp::from_secs(1)
    }

    fn system() -> ReputationSystem {
        ReputationSystem::new(ReputationConfig::default())
    }

    /// A pedigree for `S` introduced by each of `introducers` in order.
    fn pedigree(introducers: &[Address]) -> Pedigree {
        let nonces = NonceSource::new();
        introducers.iter().fold(Pedigree::new(S), |p, &i| {
            p.get_next(IntroductionRequest::new(&nonces, S, i, Address::new(99)))
        })
    }

    fn seed(system: &mut ReputationSystem, identity: Address, score: f64) {
        system.users.insert(identity, User::new(identity, score, now()));
    }

    #[test]
    fn gate_rejects_at_exact_threshold() {
        let mut sys = system();
        let threshold = sys.threshold();
        seed(&mut sys, S, threshold);
        assert!(!sys.accept(&pedigree(&[]), now()).is_accepted());

        seed(&mut sys, S, threshold + 1e-6);
        assert!(sys.accept(&pedigree(&[]), now()).is_accepted());
    }

    #[test]
    fn unknown_subject_defaults_to_zero() {
        let mut sys = system();
        let verdict = sys.accept(&pedigree(&[]), now());
        assert_eq!(verdict, Verdict::Accepted { min_reputation: 0.0 });
    }

    #[test]
    fn unknown_introducers_are_skipped() {
        let mut sys = system();
        seed(&mut sys, A, 0.5);
        let verdict = sys.accept(&pedigree(&[A, B]), now());
        // Subject unknown (0), A known (0.5), B skipped.
        assert_eq!(verdict, Verdict::Accepted { min_reputation: 0.0 });
    }

    #[test]
    fn low_introducer_blocks_admission() {
        let mut sys = system();
        seed(&mut sys, S, 0.5);
        seed(&mut sys, B, -0.5);
        let verdict = sys.accept(&pedigree(&[A, B]), now());
        assert!(matches!(verdict, Verdict::Rejected { min_reputation, .. } if min_reputation == -0.5));
    }

    #[test]
    fn accept_creates_missing_records_above_threshold() {
        let mut sys = system();
        seed(&mut sys, A, 0.5);
        sys.accept(&pedigree(&[A, B]), now());

        let threshold = sys.threshold();
        let expected = (0.0 - sys.config.epsilon).max(threshold + sys.config.epsilon);
        assert_eq!(sys.user(&S).unwrap().score(), expected);
        assert_eq!(sys.user(&B).unwrap().score(), expected);
        assert_eq!(sys.user(&A).unwrap().score(), 0.5);
        assert!(expected > threshold);
    }

    #[test]
    fn reject_creates_nothing() {
        let mut sys = system();
        seed(&mut sys, A, -0.9);
        sys.accept(&pedigree(&[A, B]), now());
        assert!(sys.user(&S).is_none());
        assert!(sys.user(&B).is_none());
        assert_eq!(sys.user_count(), 1);
    }

    #[test]
    fn feedback_is_attenuated_along_the_chain() {
        let mut sys = system();
        for id in [S, A, B, C] {
            seed(&mut sys, id, 0.5);
        }
        // C is the most recent introducer.
        let p = pedigree(&[A, B, C]);
        assert_eq!(sys.apply_feedback(&p, FeedbackKind::Bad, now()), 4);

        assert_eq!(sys.user(&S).unwrap().score(), -0.5);
        assert_eq!(sys.user(&C).unwrap().score(), 0.25);
        assert_eq!(sys.user(&B).unwrap().score(), 0.4375);
        assert_eq!(sys.user(&A).unwrap().score(), 0.5 - 1.0 / 64.0);
    }

    #[test]
    fn feedback_for_unrecorded_identities_is_ignored() {
        let mut sys = system();
        seed(&mut sys, A, 0.0);
        let p = pedigree(&[A]);
        assert_eq!(sys.apply_feedback(&p, FeedbackKind::Good, now()), 1);
        assert!(sys.user(&S).is_none());
        assert!((sys.user(&A).unwrap().score() - 0.025).abs() < 1e-12);
    }

    #[test]
    fn good_feedback_caps_at_max_score() {
        let mut sys = system();
        seed(&mut sys, S, 0.98);
        sys.apply_feedback(&pedigree(&[]), FeedbackKind::Good, now());
        assert_eq!(sys.user(&S).unwrap().score(), crate::MAX_SCORE);
    }

    #[test]
    fn negative_scores_recover_over_time_positive_do_not() {
        let mut sys = system();
        seed(&mut sys, A, -0.5);
        seed(&mut sys, B, 0.5);
        let later = Timestamp::from_secs(1 + 3600);
        let a = sys.score(&A, later).unwrap();
        assert!(a > -0.5 && a < 0.0);
        assert_eq!(sys.score(&B, later), Some(0.5));
    }

    #[test]
    fn bad_feedback_updates_threshold_immediately() {
        let mut sys = system();
        seed(&mut sys, S, 0.5);
        let before = sys.threshold();
        for _ in 0..10 {
            sys.apply_feedback(&pedigree(&[]), FeedbackKind::Bad, now());
        }
        assert!(sys.threshold() > before);
        assert!(sys.health() < 0.5);
    }

    #[test]
    fn lowest_score_is_none_without_records() {
        let mut sys = system();
        assert_eq!(sys.lowest_score(now()), None);
        seed(&mut sys, A, 0.3);
        seed(&mut sys, B, -0.2);
        assert_eq!(sys.lowest_score(now()), Some(-0.2));
    }
}
