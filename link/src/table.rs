//! Per-node table of links, keyed by remote address.

use std::collections::HashMap;

use vouch_types::Address;

use crate::{Link, LinkState};

#[derive(Debug, Default)]
pub struct LinkTable {
    links: HashMap<Address, Link>,
}

impl LinkTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a link, replacing (and returning) any previous one to the same
    /// remote.
    pub fn insert(&mut self, link: Link) -> Option<Link> {
        self.links.insert(link.remote(), link)
    }

    pub fn get(&self, remote: &Address) -> Option<&Link> {
        self.links.get(remote)
    }

    pub fn get_mut(&mut self, remote: &Address) -> Option<&mut Link> {
        self.links.get_mut(remote)
    }

    pub fn remove(&mut self, remote: &Address) -> Option<Link> {
        self.links.remove(remote)
    }

    /// Whether a link to `remote` exists and is not closed.
    pub fn contains_live(&self, remote: &Address) -> bool {
        self.links.get(remote).is_some_and(Link::is_live)
    }

    /// The live link to `remote`, if any.
    pub fn live_mut(&mut self, remote: &Address) -> Option<&mut Link> {
        self.links.get_mut(remote).filter(|link| link.is_live())
    }

    pub fn live_count(&self) -> usize {
        self.links.values().filter(|link| link.is_live()).count()
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn remotes(&self) -> impl Iterator<Item = Address> + '_ {
        self.links.keys().copied()
    }

    /// Drop every closed link, returning the remotes removed.
    pub fn remove_closed(&mut self) -> Vec<Address> {
        let closed: Vec<Address> = self
            .links
            .iter()
            .filter(|(_, link)| link.state() == LinkState::Closed)
            .map(|(remote, _)| *remote)
            .collect();
        for remote in &closed {
            self.links.remove(remote);
        }
        closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Channel, ChannelError};
    use std::time::Duration;
    use vouch_types::Timestamp;

    struct SinkChannel;

    impl Channel for SinkChannel {
        fn transmit(&mut self, _frame: &[u8]) -> Result<(), ChannelError> {
            Ok(())
        }
    }

    fn link_to(remote: u64) -> Link {
        let mut link = Link::a_priori(
            Address::new(1),
            Address::new(remote),
            Box::new(SinkChannel),
            Duration::from_millis(100),
        );
        link.on_channel_ready(Timestamp::EPOCH);
        link
    }

    #[test]
    fn live_lookup_ignores_closed_links() {
        let mut table = LinkTable::new();
        table.insert(link_to(2));
        table.insert(link_to(3));
        assert_eq!(table.live_count(), 2);

        table.get_mut(&Address::new(3)).unwrap().close();
        assert!(table.contains_live(&Address::new(2)));
        assert!(!table.contains_live(&Address::new(3)));
        assert!(table.live_mut(&Address::new(3)).is_none());
        assert_eq!(table.live_count(), 1);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn remove_closed_sweeps_only_closed_links() {
        let mut table = LinkTable::new();
        table.insert(link_to(2));
        table.insert(link_to(3));
        table.get_mut(&Address::new(2)).unwrap().force_close();

        assert_eq!(table.remove_closed(), vec![Address::new(2)]);
        assert!(table.get(&Address::new(2)).is_none());
        assert!(table.get(&Address::new(3)).is_some());
    }

    #[test]
    fn unknown_remote_is_not_live() {
        let table = LinkTable::new();
        assert!(!table.contains_live(&Address::new(7)));
        assert!(table.is_empty());
    }
}
