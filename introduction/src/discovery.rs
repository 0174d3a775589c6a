//! Host collaborators consulted by the protocol roles.

use vouch_types::Address;

/// Route and proxy knowledge supplied by the network model.
pub trait Discovery: Send + Sync {
    /// Candidate next hop from `from` toward `destination`. Successive
    /// `attempt` values yield alternates; `None` when there are no more.
    fn next_hop_toward(&self, from: Address, destination: Address, attempt: usize) -> Option<Address>;

    /// The boundary node that represents `address`, if it sits behind one.
    fn proxy_for(&self, address: Address) -> Option<Address>;
}

/// Receives the hop depth at which a chain introduction was denied.
pub trait DenialSink: Send + Sync {
    fn denied_at_depth(&self, hop_count: u32);
}
