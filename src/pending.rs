//! In-flight query table.
//!
//! Since UDP is stateless, we remember which client sent each forwarded query
//! by its 16-bit transaction id. The table is a fixed ring: once full, the
//! oldest slot is overwritten. Ids are not deduplicated and entries never
//! expire by time, so a burst of more than `capacity` queries, or two clients
//! reusing an id, can route an answer to the wrong client.

use std::net::SocketAddr;

/// Number of slots in a default table.
pub const DEFAULT_CAPACITY: usize = 32;

/// A forwarded query awaiting its upstream answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingQuery {
    pub id: u16,
    pub client: SocketAddr,
}

/// Fixed-capacity ring of pending queries with FIFO overwrite.
#[derive(Debug)]
pub struct PendingTable {
    slots: Vec<PendingQuery>,
    capacity: usize,
    cursor: usize,
}

impl PendingTable {
    /// Create an empty table. A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: Vec::with_capacity(capacity),
            capacity,
            cursor: 0,
        }
    }

    /// Record a forwarded query, overwriting the oldest entry when full.
    pub fn record(&mut self, id: u16, client: SocketAddr) {
        let entry = PendingQuery { id, client };
        if self.slots.len() < self.capacity {
            self.slots.push(entry);
        } else {
            self.slots[self.cursor] = entry;
        }
        self.cursor = (self.cursor + 1) % self.capacity;
    }

    /// Find the first occupied slot holding `id`.
    ///
    /// Lookups never remove entries; overwriting is the only deletion.
    pub fn lookup(&self, id: u16) -> Option<PendingQuery> {
        self.slots.iter().find(|entry| entry.id == id).copied()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for PendingTable {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    #[test]
    fn lookup_finds_recorded_client() {
        let mut table = PendingTable::default();
        table.record(0x1234, client(5000));

        assert_eq!(
            table.lookup(0x1234),
            Some(PendingQuery {
                id: 0x1234,
                client: client(5000)
            })
        );
        assert_eq!(table.lookup(0x4321), None);
    }

    #[test]
    fn lookup_does_not_remove() {
        let mut table = PendingTable::default();
        table.record(7, client(5000));

        assert!(table.lookup(7).is_some());
        assert!(table.lookup(7).is_some());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn oldest_entry_is_evicted_when_full() {
        let mut table = PendingTable::default();
        let capacity = table.capacity() as u16;

        for id in 0..=capacity {
            table.record(id, client(6000 + id));
        }

        assert_eq!(table.len(), table.capacity());
        assert_eq!(table.lookup(0), None);
        assert_eq!(table.lookup(1).map(|e| e.client), Some(client(6001)));
        assert_eq!(
            table.lookup(capacity).map(|e| e.client),
            Some(client(6000 + capacity))
        );
    }

    #[test]
    fn every_slot_is_used_before_wrapping() {
        let mut table = PendingTable::new(4);

        for id in 0..4 {
            table.record(id, client(7000 + id));
        }

        assert!((0..4).all(|id| table.lookup(id).is_some()));
    }

    #[test]
    fn cursor_wraps_repeatedly() {
        let mut table = PendingTable::new(3);

        for id in 0..10u16 {
            table.record(id, client(8000 + id));
        }

        assert_eq!(table.len(), 3);
        assert!((0..7).all(|id| table.lookup(id).is_none()));
        assert!((7..10).all(|id| table.lookup(id).is_some()));
    }

    #[test]
    fn duplicate_ids_return_first_slot() {
        let mut table = PendingTable::new(4);
        table.record(9, client(1000));
        table.record(9, client(2000));

        assert_eq!(table.lookup(9).map(|e| e.client), Some(client(1000)));
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        let mut table = PendingTable::new(0);
        table.record(1, client(1));
        table.record(2, client(2));

        assert_eq!(table.capacity(), 1);
        assert_eq!(table.lookup(1), None);
        assert!(table.lookup(2).is_some());
    }
}
