//! The node services protocol roles act through.

use std::fmt;

use vouch_messages::Body;
use vouch_reputation::{IncomingFeedback, OutgoingFeedback, Verdict};
use vouch_types::{Address, IntroductionRequest, Pedigree, Timestamp};

/// Identifies the role instance that owns a bounded transmission.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RoleKey {
    Requester(IntroductionRequest),
    Introducer(IntroductionRequest),
}

impl RoleKey {
    pub fn request(&self) -> IntroductionRequest {
        match self {
            Self::Requester(r) | Self::Introducer(r) => *r,
        }
    }
}

impl fmt::Display for RoleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Requester(r) => write!(f, "requester[{r}]"),
            Self::Introducer(r) => write!(f, "introducer[{r}]"),
        }
    }
}

/// Everything a role may observe or change on its node.
pub trait ProtocolContext {
    fn local(&self) -> Address;

    fn now(&self) -> Timestamp;

    /// Mint a request with a fresh nonce, this node being the requester.
    fn new_request(&mut self, introducer: Address, destination: Address) -> IntroductionRequest;

    /// Send a control message through the bounded transmission wrapper.
    /// Failures are reported back to `owner`, if any.
    fn transmit(&mut self, destination: Address, body: Body, owner: Option<RoleKey>);

    /// Send an application payload directly on the link to `destination`.
    fn send_data(&mut self, destination: Address, payload: Vec<u8>);

    fn has_live_link(&self, remote: Address) -> bool;

    /// Open an ephemeral link to `remote` justified by `request`.
    fn create_ephemeral_link(&mut self, remote: Address, request: IntroductionRequest);

    /// Add `request` as a reference on the live link to `remote`.
    fn add_link_reference(&mut self, remote: Address, request: IntroductionRequest);

    /// Drop `request` from the link to `remote` on both ends.
    fn release_reference(&mut self, remote: Address, request: IntroductionRequest);

    /// Next-hop candidate toward `destination`; see
    /// [`Discovery::next_hop_toward`](crate::Discovery::next_hop_toward).
    fn next_hop(&self, destination: Address, attempt: usize) -> Option<Address>;

    fn proxy_for(&self, destination: Address) -> Option<Address>;

    /// The stored pedigree of `peer`, empty when none was ever admitted.
    fn pedigree_of(&self, peer: Address) -> Pedigree;

    fn record_pedigree(&mut self, pedigree: Pedigree);

    /// Run the trust gate.
    fn gate(&mut self, pedigree: &Pedigree) -> Verdict;

    /// Remember to report feedback on `request` to its introducer.
    fn owe_feedback(&mut self, request: IntroductionRequest, record: OutgoingFeedback);

    /// Remember to accept feedback on `request` from its target.
    fn expect_feedback(&mut self, request: IntroductionRequest, record: IncomingFeedback);

    fn denied_at_depth(&mut self, depth: u32);
}
