//! Pending queue: remote operations waiting for their anchors
//!
//! An operation lands here when some segment it names has not been created
//! locally yet. Sweeps offer every parked operation again, oldest first,
//! and keep passing over the queue while anything integrates, so a chain of
//! operations that depended on each other drains in a single sweep once the
//! first missing segment arrives.

use crate::crdt::{Id, Operation};
use std::collections::{HashSet, VecDeque};

/// FIFO of not-yet-integrable operations
#[derive(Debug, Clone, Default)]
pub struct PendingQueue {
    operations: VecDeque<Operation>,

    /// Ids of everything in `operations`
    ids: HashSet<Id>,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Park an operation; an id that is already parked is ignored
    pub fn push(&mut self, operation: Operation) {
        if self.ids.insert(operation.id()) {
            self.operations.push_back(operation);
        }
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Check if an operation with this id is already parked
    pub fn contains(&self, id: Id) -> bool {
        self.ids.contains(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Operation> {
        self.operations.iter()
    }

    /// Offer every parked operation to `attempt`
    ///
    /// `attempt` returns true when it consumed the operation (integrated or
    /// discarded it); consumed operations leave the queue. Passes repeat
    /// until one makes no progress. Returns the number consumed.
    pub fn sweep<F>(&mut self, mut attempt: F) -> usize
    where
        F: FnMut(&Operation) -> bool,
    {
        let mut consumed = 0;

        loop {
            let before = consumed;
            let mut remaining = VecDeque::with_capacity(self.operations.len());

            while let Some(operation) = self.operations.pop_front() {
                if attempt(&operation) {
                    self.ids.remove(&operation.id());
                    consumed += 1;
                } else {
                    remaining.push_back(operation);
                }
            }

            self.operations = remaining;
            if consumed == before || self.operations.is_empty() {
                return consumed;
            }
        }
    }
}
