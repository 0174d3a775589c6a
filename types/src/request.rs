//! Introduction requests and the nonce source that makes each one unique.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::Address;

/// A unique, monotonically assigned request number.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Nonce(u64);

impl Nonce {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Nonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Monotonic counter handing out [`Nonce`]s.
///
/// One source is owned by the process (or simulation) context and shared by
/// every node in it, so nonces are unique across all requests that can ever
/// meet on the wire. Tests create their own source to stay deterministic.
#[derive(Debug)]
pub struct NonceSource {
    next: AtomicU64,
}

impl NonceSource {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }

    /// Take the next nonce.
    pub fn next(&self) -> Nonce {
        Nonce(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for NonceSource {
    fn default() -> Self {
        Self::new()
    }
}

/// An immutable request for `introducer` to introduce `requester` to a node
/// on the way to `destination`.
///
/// Equality and hashing include the nonce: two requests built from the same
/// triple are always distinct, so a request is safe to use as a map key even
/// when the same introduction is attempted again.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IntroductionRequest {
    requester: Address,
    introducer: Address,
    destination: Address,
    nonce: Nonce,
}

impl IntroductionRequest {
    /// Build a new request, drawing a fresh nonce from `nonces`.
    pub fn new(
        nonces: &NonceSource,
        requester: Address,
        introducer: Address,
        destination: Address,
    ) -> Self {
        Self {
            requester,
            introducer,
            destination,
            nonce: nonces.next(),
        }
    }

    pub fn requester(&self) -> Address {
        self.requester
    }

    pub fn introducer(&self) -> Address {
        self.introducer
    }

    pub fn destination(&self) -> Address {
        self.destination
    }

    pub fn nonce(&self) -> Nonce {
        self.nonce
    }
}

impl fmt::Display for IntroductionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}->{} via {} {}",
            self.requester, self.destination, self.introducer, self.nonce
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn same_triple_yields_distinct_requests() {
        let nonces = NonceSource::new();
        let (r, i, d) = (Address::new(1), Address::new(2), Address::new(3));
        let a = IntroductionRequest::new(&nonces, r, i, d);
        let b = IntroductionRequest::new(&nonces, r, i, d);
        assert_ne!(a, b);

        let set: HashSet<_> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn nonces_are_monotonic() {
        let nonces = NonceSource::starting_at(10);
        let first = nonces.next();
        let second = nonces.next();
        assert_eq!(first.as_u64(), 10);
        assert!(second > first);
    }

    #[test]
    fn accessors_return_the_triple() {
        let nonces = NonceSource::new();
        let req = IntroductionRequest::new(&nonces, Address::new(7), Address::new(8), Address::new(9));
        assert_eq!(req.requester(), Address::new(7));
        assert_eq!(req.introducer(), Address::new(8));
        assert_eq!(req.destination(), Address::new(9));
    }
}
