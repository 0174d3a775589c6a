//! Recording [`ProtocolContext`] for role unit tests.

use std::collections::HashMap;

use vouch_messages::{Body, MessageKind};
use vouch_reputation::{IncomingFeedback, OutgoingFeedback, PedigreeBook, Verdict};
use vouch_types::{Address, IntroductionRequest, NonceSource, Pedigree, Timestamp};

use crate::{ProtocolContext, RoleKey};

pub(crate) const R: Address = Address::new(10);
pub(crate) const I: Address = Address::new(20);
pub(crate) const T: Address = Address::new(30);

pub(crate) struct MockContext {
    pub local: Address,
    pub now: Timestamp,
    nonces: NonceSource,
    /// Live links and the references each carries.
    links: HashMap<Address, Vec<IntroductionRequest>>,
    pub sent: Vec<(Address, Body, Option<RoleKey>)>,
    pub data: Vec<(Address, Vec<u8>)>,
    pub created: Vec<(Address, IntroductionRequest)>,
    pub released: Vec<(Address, IntroductionRequest)>,
    pub routes: Vec<Address>,
    pub proxies: HashMap<Address, Address>,
    pub reject_all: bool,
    book: PedigreeBook,
    pub owed: Vec<(IntroductionRequest, OutgoingFeedback)>,
    pub expected: Vec<(IntroductionRequest, IncomingFeedback)>,
    pub denials: Vec<u32>,
}

impl MockContext {
    pub fn new(local: Address) -> Self {
        Self {
            local,
            now: Timestamp::from_secs(1),
            nonces: NonceSource::new(),
            links: HashMap::new(),
            sent: Vec::new(),
            data: Vec::new(),
            created: Vec::new(),
            released: Vec::new(),
            routes: Vec::new(),
            proxies: HashMap::new(),
            reject_all: false,
            book: PedigreeBook::new(),
            owed: Vec::new(),
            expected: Vec::new(),
            denials: Vec::new(),
        }
    }

    /// Add an a-priori link to `remote`.
    pub fn connect(&mut self, remote: Address) {
        self.links.entry(remote).or_default();
    }

    pub fn references(&self, remote: Address) -> Vec<IntroductionRequest> {
        self.links.get(&remote).cloned().unwrap_or_default()
    }

    pub fn sent_kinds(&self) -> Vec<(Address, MessageKind)> {
        self.sent.iter().map(|(to, body, _)| (*to, body.kind())).collect()
    }
}

impl ProtocolContext for MockContext {
    fn local(&self) -> Address {
        self.local
    }

    fn now(&self) -> Timestamp {
        self.now
    }

    fn new_request(&mut self, introducer: Address, destination: Address) -> IntroductionRequest {
        IntroductionRequest::new(&self.nonces, self.local, introducer, destination)
    }

    fn transmit(&mut self, destination: Address, body: Body, owner: Option<RoleKey>) {
        self.sent.push((destination, body, owner));
    }

    fn send_data(&mut self, destination: Address, payload: Vec<u8>) {
        self.data.push((destination, payload));
    }

    fn has_live_link(&self, remote: Address) -> bool {
        self.links.contains_key(&remote)
    }

    fn create_ephemeral_link(&mut self, remote: Address, request: IntroductionRequest) {
        self.created.push((remote, request));
        self.links.insert(remote, vec![request]);
    }

    fn add_link_reference(&mut self, remote: Address, request: IntroductionRequest) {
        self.links.entry(remote).or_default().push(request);
    }

    fn release_reference(&mut self, remote: Address, request: IntroductionRequest) {
        self.released.push((remote, request));
        if let Some(refs) = self.links.get_mut(&remote) {
            refs.retain(|r| *r != request);
        }
    }

    fn next_hop(&self, _destination: Address, attempt: usize) -> Option<Address> {
        self.routes.get(attempt).copied()
    }

    fn proxy_for(&self, destination: Address) -> Option<Address> {
        self.proxies.get(&destination).copied()
    }

    fn pedigree_of(&self, peer: Address) -> Pedigree {
        self.book.pedigree_of(peer)
    }

    fn record_pedigree(&mut self, pedigree: Pedigree) {
        self.book.record(pedigree);
    }

    fn gate(&mut self, _pedigree: &Pedigree) -> Verdict {
        if self.reject_all {
            Verdict::Rejected {
                min_reputation: -1.0,
                threshold: 0.0,
            }
        } else {
            Verdict::Accepted {
                min_reputation: 0.0,
            }
        }
    }

    fn owe_feedback(&mut self, request: IntroductionRequest, record: OutgoingFeedback) {
        self.owed.push((request, record));
    }

    fn expect_feedback(&mut self, request: IntroductionRequest, record: IncomingFeedback) {
        self.expected.push((request, record));
    }

    fn denied_at_depth(&mut self, depth: u32) {
        self.denials.push(depth);
    }
}
