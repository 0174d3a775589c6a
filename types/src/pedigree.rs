//! Pedigrees: the chain of introductions that vouched for a node.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Address, IntroductionRequest};

/// Immutable record of how `subject` came to be trusted: the ordered list of
/// introductions, earliest first, that led to it.
///
/// Extension is copy-on-write: [`Pedigree::get_next`] returns a new pedigree
/// and leaves the receiver untouched.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pedigree {
    subject: Address,
    requests: Vec<IntroductionRequest>,
}

impl Pedigree {
    /// A pedigree with no introduction history.
    pub fn new(subject: Address) -> Self {
        Self {
            subject,
            requests: Vec::new(),
        }
    }

    pub fn subject(&self) -> Address {
        self.subject
    }

    /// The introductions, earliest first.
    pub fn requests(&self) -> &[IntroductionRequest] {
        &self.requests
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// The most recent introduction, if any.
    pub fn last(&self) -> Option<&IntroductionRequest> {
        self.requests.last()
    }

    /// Return a new pedigree with `request` appended.
    pub fn get_next(&self, request: IntroductionRequest) -> Pedigree {
        let mut requests = Vec::with_capacity(self.requests.len() + 1);
        requests.extend_from_slice(&self.requests);
        requests.push(request);
        Pedigree {
            subject: self.subject,
            requests,
        }
    }

    /// Introducers along the chain, most recent first.
    pub fn introducers(&self) -> impl Iterator<Item = Address> + '_ {
        self.requests.iter().rev().map(|r| r.introducer())
    }
}

impl fmt::Display for Pedigree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.subject)?;
        for introducer in self.requests.iter().map(|r| r.introducer()) {
            write!(f, " <- {introducer}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NonceSource;

    #[test]
    fn new_pedigree_is_empty() {
        let p = Pedigree::new(Address::new(1));
        assert!(p.is_empty());
        assert_eq!(p.len(), 0);
        assert!(p.last().is_none());
    }

    #[test]
    fn get_next_leaves_original_untouched() {
        let nonces = NonceSource::new();
        let subject = Address::new(1);
        let r = IntroductionRequest::new(&nonces, subject, Address::new(2), Address::new(3));

        let p1 = Pedigree::new(subject);
        let p2 = p1.get_next(r);

        assert!(p1.is_empty());
        assert_eq!(p2.requests(), &[r]);
        assert_eq!(p2.subject(), subject);
    }

    #[test]
    fn introducers_are_most_recent_first() {
        let nonces = NonceSource::new();
        let subject = Address::new(1);
        let first = IntroductionRequest::new(&nonces, subject, Address::new(10), Address::new(99));
        let second = IntroductionRequest::new(&nonces, subject, Address::new(20), Address::new(99));

        let p = Pedigree::new(subject).get_next(first).get_next(second);
        let order: Vec<_> = p.introducers().collect();
        assert_eq!(order, vec![Address::new(20), Address::new(10)]);
        assert_eq!(p.last(), Some(&second));
    }
}
