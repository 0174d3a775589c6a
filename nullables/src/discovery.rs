//! Nullable discovery and denial telemetry.

use std::collections::HashMap;
use std::sync::Mutex;

use vouch_introduction::{DenialSink, Discovery};
use vouch_types::Address;

/// A static routing table.
///
/// `add_route(from, destination, hops)` makes `hops` the candidates `from`
/// gets, in order, when asking for a next hop toward `destination`.
#[derive(Debug, Default)]
pub struct NullDiscovery {
    routes: Mutex<HashMap<(Address, Address), Vec<Address>>>,
    proxies: Mutex<HashMap<Address, Address>>,
}

impl NullDiscovery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_route(&self, from: Address, destination: Address, hops: Vec<Address>) {
        self.routes.lock().unwrap().insert((from, destination), hops);
    }

    /// `proxy` represents `address` to the rest of the network.
    pub fn set_proxy(&self, address: Address, proxy: Address) {
        self.proxies.lock().unwrap().insert(address, proxy);
    }
}

impl Discovery for NullDiscovery {
    fn next_hop_toward(&self, from: Address, destination: Address, attempt: usize) -> Option<Address> {
        self.routes
            .lock()
            .unwrap()
            .get(&(from, destination))
            .and_then(|hops| hops.get(attempt).copied())
    }

    fn proxy_for(&self, address: Address) -> Option<Address> {
        self.proxies.lock().unwrap().get(&address).copied()
    }
}

/// Records every reported denial depth.
#[derive(Debug, Default)]
pub struct NullDenialSink {
    depths: Mutex<Vec<u32>>,
}

impl NullDenialSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recorded(&self) -> Vec<u32> {
        self.depths.lock().unwrap().clone()
    }
}

impl DenialSink for NullDenialSink {
    fn denied_at_depth(&self, hop_count: u32) {
        self.depths.lock().unwrap().push(hop_count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alternates_are_returned_in_order() {
        let discovery = NullDiscovery::new();
        let (a, d) = (Address::new(1), Address::new(9));
        discovery.add_route(a, d, vec![Address::new(2), Address::new(3)]);
        assert_eq!(discovery.next_hop_toward(a, d, 0), Some(Address::new(2)));
        assert_eq!(discovery.next_hop_toward(a, d, 1), Some(Address::new(3)));
        assert_eq!(discovery.next_hop_toward(a, d, 2), None);
        assert_eq!(discovery.next_hop_toward(d, a, 0), None);
    }

    #[test]
    fn denial_depths_are_recorded() {
        let sink = NullDenialSink::new();
        sink.denied_at_depth(2);
        sink.denied_at_depth(1);
        assert_eq!(sink.recorded(), vec![2, 1]);
    }
}
