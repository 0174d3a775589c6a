//! Nullable network: an in-memory wire between simulated nodes.
//!
//! Channels opened through [`NullNetwork`] append their frames to one shared
//! FIFO instead of sending them anywhere. The test pops [`WireEvent`]s and
//! feeds them to the receiving node, which gives full control over delivery
//! order, loss and channel failure.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use vouch_link::{Channel, ChannelError, ChannelFactory};
use vouch_types::Address;

/// Something the wire has for a node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WireEvent {
    /// A frame written by `from` for `to`.
    Frame {
        from: Address,
        to: Address,
        bytes: Vec<u8>,
    },
    /// The channel `node` opened to `remote` is ready.
    Ready { node: Address, remote: Address },
}

#[derive(Debug, Default)]
struct Wire {
    events: VecDeque<WireEvent>,
    /// Directed pairs whose writes fail.
    broken: HashSet<(Address, Address)>,
    /// Directed pairs whose next N frames are silently lost.
    lossy: HashMap<(Address, Address), usize>,
    frames_written: usize,
    frames_lost: usize,
}

/// Shared handle to the simulated wire. Clones see the same wire.
#[derive(Clone, Debug, Default)]
pub struct NullNetwork {
    wire: Arc<Mutex<Wire>>,
}

impl NullNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the next event off the wire.
    pub fn pop(&self) -> Option<WireEvent> {
        self.wire.lock().unwrap().events.pop_front()
    }

    pub fn is_idle(&self) -> bool {
        self.wire.lock().unwrap().events.is_empty()
    }

    /// Make every write from `from` to `to` fail.
    pub fn break_channel(&self, from: Address, to: Address) {
        self.wire.lock().unwrap().broken.insert((from, to));
    }

    /// Silently lose the next `count` frames written from `from` to `to`.
    pub fn drop_next(&self, from: Address, to: Address, count: usize) {
        *self.wire.lock().unwrap().lossy.entry((from, to)).or_default() += count;
    }

    /// Frames accepted onto the wire, including lost ones.
    pub fn frames_written(&self) -> usize {
        self.wire.lock().unwrap().frames_written
    }

    pub fn frames_lost(&self) -> usize {
        self.wire.lock().unwrap().frames_lost
    }
}

impl ChannelFactory for NullNetwork {
    fn open(&self, local: Address, remote: Address) -> Box<dyn Channel> {
        self.wire.lock().unwrap().events.push_back(WireEvent::Ready {
            node: local,
            remote,
        });
        Box::new(NullChannel {
            wire: self.wire.clone(),
            local,
            remote,
        })
    }
}

struct NullChannel {
    wire: Arc<Mutex<Wire>>,
    local: Address,
    remote: Address,
}

impl Channel for NullChannel {
    fn transmit(&mut self, frame: &[u8]) -> Result<(), ChannelError> {
        let mut guard = self.wire.lock().unwrap();
        let wire = &mut *guard;
        let pair = (self.local, self.remote);
        if wire.broken.contains(&pair) {
            return Err(ChannelError::Closed(self.remote));
        }
        wire.frames_written += 1;
        if let Some(remaining) = wire.lossy.get_mut(&pair) {
            if *remaining > 0 {
                *remaining -= 1;
                wire.frames_lost += 1;
                return Ok(());
            }
        }
        wire.events.push_back(WireEvent::Frame {
            from: self.local,
            to: self.remote,
            bytes: frame.to_vec(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: Address = Address::new(1);
    const B: Address = Address::new(2);

    #[test]
    fn open_announces_ready_then_carries_frames() {
        let net = NullNetwork::new();
        let mut channel = net.open(A, B);
        channel.transmit(b"hi").unwrap();

        assert_eq!(net.pop(), Some(WireEvent::Ready { node: A, remote: B }));
        assert_eq!(
            net.pop(),
            Some(WireEvent::Frame {
                from: A,
                to: B,
                bytes: b"hi".to_vec()
            })
        );
        assert!(net.is_idle());
    }

    #[test]
    fn broken_channel_fails_writes() {
        let net = NullNetwork::new();
        let mut channel = net.open(A, B);
        net.break_channel(A, B);
        assert!(matches!(
            channel.transmit(b"x"),
            Err(ChannelError::Closed(addr)) if addr == B
        ));
    }

    #[test]
    fn lossy_pair_drops_only_the_requested_frames() {
        let net = NullNetwork::new();
        let mut channel = net.open(A, B);
        net.pop();
        net.drop_next(A, B, 1);
        channel.transmit(b"1").unwrap();
        channel.transmit(b"2").unwrap();

        assert_eq!(net.frames_written(), 2);
        assert_eq!(net.frames_lost(), 1);
        assert!(matches!(net.pop(), Some(WireEvent::Frame { bytes, .. }) if bytes == b"2"));
    }
}
