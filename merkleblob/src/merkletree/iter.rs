//! Walks over the live nodes of a tree.
//!
//! Both iterators read straight from a [`SlotArena`] so they can be used on a
//! buffer whose indexes have not been rebuilt yet. A decoding failure is
//! yielded once as an `Err`, after which the iterator is exhausted. Visiting
//! more nodes than the buffer has slots is reported as a cycle.

use std::collections::VecDeque;

use crate::error::{MerkleBlobError, Result};
use crate::merkletree::arena::SlotArena;
use crate::merkletree::node::{NodeMetadata, RawNode, TreeIndex};

pub type IterItem = Result<(TreeIndex, NodeMetadata, RawNode)>;

fn cycle_error(index: TreeIndex) -> MerkleBlobError {
    MerkleBlobError::Integrity(format!("node {} reached more often than slots exist", index))
}

/// Level order, left to right.
pub struct BreadthFirstIterator<'a> {
    arena: &'a SlotArena,
    queue: VecDeque<TreeIndex>,
    visited: usize,
}

impl<'a> BreadthFirstIterator<'a> {
    pub fn new(arena: &'a SlotArena, root: Option<TreeIndex>) -> Self {
        Self {
            arena,
            queue: root.into_iter().collect(),
            visited: 0,
        }
    }
}

impl Iterator for BreadthFirstIterator<'_> {
    type Item = IterItem;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.queue.pop_front()?;
        self.visited += 1;
        if self.visited > self.arena.slot_count() {
            self.queue.clear();
            return Some(Err(cycle_error(index)));
        }
        match self.arena.read(index) {
            Ok((metadata, node)) => {
                if let RawNode::Internal(ref internal) = node {
                    self.queue.push_back(internal.left);
                    self.queue.push_back(internal.right);
                }
                Some(Ok((index, metadata, node)))
            }
            Err(err) => {
                self.queue.clear();
                Some(Err(err))
            }
        }
    }
}

/// Post-order: left subtree, right subtree, then the node itself.
pub struct LeftChildFirstIterator<'a> {
    arena: &'a SlotArena,
    stack: Vec<(TreeIndex, bool)>,
    visited: usize,
}

impl<'a> LeftChildFirstIterator<'a> {
    pub fn new(arena: &'a SlotArena, root: Option<TreeIndex>) -> Self {
        Self {
            arena,
            stack: root.map(|index| (index, false)).into_iter().collect(),
            visited: 0,
        }
    }
}

impl Iterator for LeftChildFirstIterator<'_> {
    type Item = IterItem;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (index, children_done) = self.stack.pop()?;
            let (metadata, node) = match self.arena.read(index) {
                Ok(item) => item,
                Err(err) => {
                    self.stack.clear();
                    return Some(Err(err));
                }
            };
            match node {
                RawNode::Internal(ref internal) if !children_done => {
                    self.visited += 1;
                    if self.visited > self.arena.slot_count() {
                        self.stack.clear();
                        return Some(Err(cycle_error(index)));
                    }
                    self.stack.push((index, true));
                    self.stack.push((internal.right, false));
                    self.stack.push((internal.left, false));
                }
                _ => return Some(Ok((index, metadata, node))),
            }
        }
    }
}
