//! Choice of the leaf that the next automatic insert splits.
//!
//! Leaves are ordered by depth first and by the order they were queued
//! second, so an insert always splits one of the shallowest leaves, and among
//! those the one that has waited longest. This keeps the tree close to
//! `ceil(log2(n))` under mixed insert/delete workloads.
//!
//! Entries are keyed by [`KvId`] because slots move on delete while keys do
//! not. Removal and re-queueing are lazy: the heap may hold stale entries,
//! which are skipped when they surface and dropped wholesale when they
//! outnumber live ones.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use log::debug;

use crate::def::SPLIT_QUEUE_COMPACT_FLOOR;
use crate::merkletree::node::KvId;

#[derive(Debug, Clone, Default)]
pub struct SplitQueue {
    heap: BinaryHeap<Reverse<(u32, u64, KvId)>>,
    live: HashMap<KvId, (u64, u32)>,
    next_seq: u64,
    compact_ratio: usize,
}

impl SplitQueue {
    pub fn new(compact_ratio: usize) -> Self {
        Self {
            compact_ratio: compact_ratio.max(1),
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Depth recorded for `key` when it was last queued.
    pub fn depth(&self, key: KvId) -> Option<u32> {
        self.live.get(&key).map(|&(_, depth)| depth)
    }

    /// Queues `key` at `depth`, replacing any earlier entry for it.
    pub fn push(&mut self, key: KvId, depth: u32) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.live.insert(key, (seq, depth));
        self.heap.push(Reverse((depth, seq, key)));
        self.maybe_compact();
    }

    pub fn remove(&mut self, key: KvId) {
        if self.live.remove(&key).is_some() {
            self.maybe_compact();
        }
    }

    /// The leaf the next automatic insert should split.
    pub fn peek(&mut self) -> Option<KvId> {
        while let Some(&Reverse((depth, seq, key))) = self.heap.peek() {
            if self.live.get(&key) == Some(&(seq, depth)) {
                return Some(key);
            }
            self.heap.pop();
        }
        None
    }

    pub fn clear(&mut self) {
        self.heap.clear();
        self.live.clear();
        self.next_seq = 0;
    }

    pub fn stale_count(&self) -> usize {
        self.heap.len() - self.live.len()
    }

    fn maybe_compact(&mut self) {
        let limit = self.compact_ratio * self.live.len() + SPLIT_QUEUE_COMPACT_FLOOR;
        if self.heap.len() <= limit {
            return;
        }
        let stale = self.stale_count();
        self.heap = self
            .live
            .iter()
            .map(|(&key, &(seq, depth))| Reverse((depth, seq, key)))
            .collect();
        debug!(
            "split queue dropped {} stale entries, {} remain",
            stale,
            self.heap.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shallowest_first_then_fifo() {
        let mut queue = SplitQueue::new(2);
        queue.push(KvId(1), 2);
        queue.push(KvId(2), 1);
        queue.push(KvId(3), 1);
        assert_eq!(queue.peek(), Some(KvId(2)));
        queue.push(KvId(2), 2);
        assert_eq!(queue.peek(), Some(KvId(3)));
        queue.push(KvId(3), 2);
        // all at depth 2 now, in queueing order
        assert_eq!(queue.peek(), Some(KvId(1)));
        queue.remove(KvId(1));
        assert_eq!(queue.peek(), Some(KvId(2)));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_requeue_replaces_entry() {
        let mut queue = SplitQueue::new(2);
        queue.push(KvId(7), 5);
        queue.push(KvId(7), 3);
        assert_eq!(queue.depth(KvId(7)), Some(3));
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.peek(), Some(KvId(7)));
    }

    #[test]
    fn test_compaction_drops_stale_entries() {
        let mut queue = SplitQueue::new(1);
        queue.push(KvId(0), 0);
        for depth in 1..1000 {
            queue.push(KvId(0), depth);
        }
        assert!(queue.stale_count() <= SPLIT_QUEUE_COMPACT_FLOOR + 1);
        assert_eq!(queue.peek(), Some(KvId(0)));
        assert_eq!(queue.depth(KvId(0)), Some(999));
    }

    #[test]
    fn test_empty() {
        let mut queue = SplitQueue::new(2);
        assert_eq!(queue.peek(), None);
        queue.push(KvId(1), 0);
        queue.remove(KvId(1));
        assert!(queue.is_empty());
        assert_eq!(queue.peek(), None);
    }
}
