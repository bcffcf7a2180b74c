//! Insertion engine: leaf insertion with upward split propagation.
//!
//! Every node a split needs is reserved from the store before the first
//! key moves. Once the reservation succeeds the remaining steps cannot fail
//! on allocation, so an `AllocationFailure` leaves the tree untouched.

use tracing::{debug, trace};

use super::key::{Key, RowLocator};
use super::node::{Node, NodeId};
use super::tree::BPlusTree;
use crate::common::config::DuplicatePolicy;
use crate::common::{Error, Result};

impl BPlusTree {
    /// Insert a (key, locator) pair.
    ///
    /// Under [`DuplicatePolicy::Allow`] an existing key gets another entry,
    /// placed after the entries already stored under it.
    ///
    /// # Errors
    /// - `Error::InvalidArgument` for a key of the wrong type, or an existing
    ///   key under [`DuplicatePolicy::Reject`]
    /// - `Error::AllocationFailure` if the nodes for a split can't be
    ///   allocated; the tree is unchanged
    pub fn insert(&mut self, key: Key, locator: RowLocator) -> Result<()> {
        self.key_type.check(&key)?;
        if self.duplicates == DuplicatePolicy::Reject && self.contains(&key)? {
            return Err(Error::invalid(format!("duplicate key {}", key)));
        }

        if self.root.is_none() {
            let mut leaf = Node::leaf(None);
            leaf.insert_entry(key, locator)?;
            let id = self.store.allocate(leaf)?;
            self.root = Some(id);
            self.entry_count = 1;
            debug!(root = %id, "created root leaf");
            return Ok(());
        }

        let leaf_id = self.locate_leaf(&key)?;
        if self.store.get(leaf_id)?.count() < self.max_keys {
            self.store.get_mut(leaf_id)?.insert_entry(key, locator)?;
            self.entry_count += 1;
            return Ok(());
        }

        let needed = self.split_allocations(leaf_id)?;
        self.store.reserve(needed)?;
        self.split_leaf(leaf_id, key, locator)?;
        self.entry_count += 1;
        Ok(())
    }

    /// Nodes a split starting at `leaf_id` will allocate: one per full
    /// node on the path to the root, plus a new root if the root is full.
    fn split_allocations(&self, leaf_id: NodeId) -> Result<usize> {
        let mut needed = 1;
        let mut parent = self.store.get(leaf_id)?.parent;
        while let Some(id) = parent {
            let node = self.store.get(id)?;
            if node.count() < self.max_keys {
                return Ok(needed);
            }
            needed += 1;
            parent = node.parent;
        }
        Ok(needed + 1)
    }

    /// Split a full leaf around the incoming entry.
    ///
    /// The original leaf keeps the first `ceil((max_keys + 1) / 2)` entries.
    /// A copy of the new leaf's first key goes up to the parent.
    fn split_leaf(&mut self, leaf_id: NodeId, key: Key, locator: RowLocator) -> Result<()> {
        let split = (self.max_keys + 1).div_ceil(2);
        let new_id = self.store.allocate(Node::leaf(None))?;

        let promoted = {
            let (leaf, sibling) = self.store.pair_mut(leaf_id, new_id)?;
            leaf.insert_entry(key, locator)?;

            sibling.keys = leaf.keys.split_off(split);
            *sibling.locators_mut()? = leaf.locators_mut()?.split_off(split);
            sibling.parent = leaf.parent;
            sibling.set_next_leaf(leaf.next_leaf()?)?;
            leaf.set_next_leaf(Some(new_id))?;

            sibling
                .keys
                .first()
                .cloned()
                .ok_or_else(|| Error::invariant("leaf split produced an empty sibling"))?
        };

        debug!(left = %leaf_id, right = %new_id, separator = %promoted, "split leaf");
        self.insert_into_parent(leaf_id, new_id, promoted)
    }

    /// Hook `right` into the tree as the sibling following `left`.
    fn insert_into_parent(&mut self, left: NodeId, right: NodeId, key: Key) -> Result<()> {
        let Some(parent_id) = self.store.get(left)?.parent else {
            let mut root = Node::internal(None);
            root.keys.push(key);
            root.children_mut()?.extend([left, right]);
            let root_id = self.store.allocate(root)?;

            self.store.get_mut(left)?.parent = Some(root_id);
            self.store.get_mut(right)?.parent = Some(root_id);
            self.root = Some(root_id);
            debug!(root = %root_id, "tree grew a level");
            return Ok(());
        };

        let overflow = {
            let parent = self.store.get_mut(parent_id)?;
            let idx = parent.child_index(left)?;
            parent.keys.insert(idx, key);
            parent.children_mut()?.insert(idx + 1, right);
            parent.count() > self.max_keys
        };
        self.store.get_mut(right)?.parent = Some(parent_id);

        if overflow {
            self.split_internal(parent_id)
        } else {
            trace!(parent = %parent_id, child = %right, "linked new child");
            Ok(())
        }
    }

    /// Split an internal node holding `max_keys + 1` keys.
    ///
    /// The key at `mid = floor((max_keys + 1) / 2)` moves up and is kept in
    /// neither half.
    fn split_internal(&mut self, node_id: NodeId) -> Result<()> {
        let mid = (self.max_keys + 1) / 2;
        let new_id = self.store.allocate(Node::internal(None))?;

        let (promoted, moved) = {
            let (node, sibling) = self.store.pair_mut(node_id, new_id)?;
            let mut upper = node.keys.split_off(mid);
            if upper.is_empty() {
                return Err(Error::invariant(format!("{} split with no keys to promote", node_id)));
            }
            let promoted = upper.remove(0);
            sibling.keys = upper;

            let moved = node.children_mut()?.split_off(mid + 1);
            sibling.children_mut()?.extend_from_slice(&moved);
            sibling.parent = node.parent;
            (promoted, moved)
        };

        for child in moved {
            self.store.get_mut(child)?.parent = Some(new_id);
        }

        debug!(left = %node_id, right = %new_id, separator = %promoted, "split internal node");
        self.insert_into_parent(node_id, new_id, promoted)
    }
}
