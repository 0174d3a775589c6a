//! Bookkeeping that carries feedback back along an introduction chain.
//!
//! A target that admits a peer remembers which introducer vouched for it
//! ([`OutgoingFeedback`]); an introducer that completed an introduction
//! remembers which earlier request, if any, vouched for the requester
//! ([`IncomingFeedback`]). Both live in an [`ExpiringLedger`] so records for
//! introductions that never receive feedback are eventually dropped.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::time::Duration;

use vouch_types::{Address, IntroductionRequest, Pedigree, Timestamp};

/// Held by a target until it reports feedback on an admitted peer.
#[derive(Clone, Debug, PartialEq)]
pub struct OutgoingFeedback {
    pub pedigree: Pedigree,
    pub introducer: Address,
}

/// Held by an introducer until the target reports feedback.
#[derive(Clone, Debug, PartialEq)]
pub struct IncomingFeedback {
    pub pedigree: Pedigree,
    /// The request that introduced the requester to us, if any.
    pub prior: Option<IntroductionRequest>,
}

/// Records that expire a fixed time after insertion, keyed by introduction
/// request unless another key is given.
///
/// Records are only ever inserted at the current time, so insertion order is
/// timestamp order and a sweep can stop at the first live record.
#[derive(Debug)]
pub struct ExpiringLedger<V, K = IntroductionRequest> {
    records: HashMap<K, (V, Timestamp)>,
    order: VecDeque<(K, Timestamp)>,
}

impl<V, K> Default for ExpiringLedger<V, K> {
    fn default() -> Self {
        Self {
            records: HashMap::new(),
            order: VecDeque::new(),
        }
    }
}

impl<V, K: Copy + Eq + Hash> ExpiringLedger<V, K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the record for `key`.
    pub fn insert(&mut self, key: K, value: V, now: Timestamp) {
        self.records.insert(key, (value, now));
        self.order.push_back((key, now));
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.records.get(key).map(|(value, _)| value)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.records.contains_key(key)
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.records.remove(key).map(|(value, _)| value)
    }

    /// Live records in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.records.iter().map(|(key, (value, _))| (key, value))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Drop every record older than `ttl`, oldest first, returning them.
    pub fn sweep(&mut self, ttl: Duration, now: Timestamp) -> Vec<(K, V)> {
        let mut expired = Vec::new();
        while let Some(&(key, inserted_at)) = self.order.front() {
            let current = self.records.get(&key).map(|(_, at)| *at);
            if current != Some(inserted_at) {
                // Removed or replaced since this entry was queued.
                self.order.pop_front();
                continue;
            }
            if !inserted_at.has_expired(ttl, now) {
                break;
            }
            self.order.pop_front();
            if let Some((value, _)) = self.records.remove(&key) {
                expired.push((key, value));
            }
        }
        expired
    }
}

/// The most recently admitted pedigree of each peer.
///
/// Peers with no entry, such as a-priori neighbors, have an empty pedigree.
#[derive(Debug, Default)]
pub struct PedigreeBook {
    pedigrees: HashMap<Address, Pedigree>,
}

impl PedigreeBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pedigree_of(&self, peer: Address) -> Pedigree {
        self.pedigrees
            .get(&peer)
            .cloned()
            .unwrap_or_else(|| Pedigree::new(peer))
    }

    pub fn record(&mut self, pedigree: Pedigree) {
        self.pedigrees.insert(pedigree.subject(), pedigree);
    }

    pub fn len(&self) -> usize {
        self.pedigrees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pedigrees.is_empty()
    }
}
