//! Bounded ring of recently-applied operations, replayed to late joiners as
//! part of their snapshot burst.

use std::collections::VecDeque;

use scenesync_core::Operation;

/// Maximum operations retained in the ring.
pub const HISTORY_CAPACITY: usize = 1024;

/// Maximum operations handed to a single joiner's snapshot.
pub const SNAPSHOT_BURST_LIMIT: usize = 100;

/// FIFO ring of applied operations, oldest evicted first past capacity.
#[derive(Debug, Default)]
pub struct History {
    ring: VecDeque<Operation>,
}

impl History {
    /// An empty ring.
    #[must_use]
    pub fn new() -> Self {
        Self { ring: VecDeque::new() }
    }

    /// Record a newly applied operation.
    pub fn record(&mut self, op: Operation) {
        self.ring.push_back(op);
        if self.ring.len() > HISTORY_CAPACITY {
            self.ring.pop_front();
        }
    }

    /// Number of operations currently retained.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    /// Whether the ring is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// The most recent [`SNAPSHOT_BURST_LIMIT`] operations, oldest first,
    /// for a late joiner's snapshot burst.
    pub fn recent_for_snapshot(&self) -> impl Iterator<Item = &Operation> {
        let skip = self.ring.len().saturating_sub(SNAPSHOT_BURST_LIMIT);
        self.ring.iter().skip(skip)
    }
}
