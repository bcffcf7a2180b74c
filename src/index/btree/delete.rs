//! Deletion engine: leaf removal with upward underflow repair.
//!
//! An underfull node is merged with a sibling when the two fit in one node,
//! otherwise it borrows exactly one entry across the boundary. Merges always
//! fold the right node of the pair into the left one so the leaf chain only
//! ever loses the node being released.

use tracing::debug;

use super::key::{Key, RowLocator};
use super::node::{Node, NodeBody, NodeId};
use super::tree::BPlusTree;
use crate::common::{Error, Result};

impl BPlusTree {
    /// Remove one entry stored under `key` and return its locator.
    ///
    /// With duplicates, the first entry in key order is removed.
    ///
    /// # Errors
    /// - `Error::InvalidArgument` for a key of the wrong type
    /// - `Error::EmptyTree` / `Error::KeyNotFound` if there is nothing to remove
    pub fn delete(&mut self, key: &Key) -> Result<RowLocator> {
        self.key_type.check(key)?;
        let (leaf_id, idx) = self.seek_exact(key)?;
        let (_, locator) = self.store.get_mut(leaf_id)?.remove_entry(idx)?;
        self.entry_count -= 1;

        self.rebalance(leaf_id)?;
        Ok(locator)
    }

    /// Restore occupancy of `node_id` after it lost a key.
    fn rebalance(&mut self, node_id: NodeId) -> Result<()> {
        let node = self.store.get(node_id)?;
        let Some(parent_id) = node.parent else {
            return self.collapse_root(node_id);
        };
        if node.count() >= self.min_keys() {
            return Ok(());
        }
        let is_leaf = node.is_leaf();

        let parent = self.store.get(parent_id)?;
        let idx = parent.child_index(node_id)?;
        let children = parent.children()?;
        // The first child pairs with its right sibling, every other child
        // with its left one. `sep` is the separator between the pair.
        let (left, right, sep) = if idx == 0 {
            let right = *children
                .get(1)
                .ok_or_else(|| Error::invariant(format!("{} has a single child", parent_id)))?;
            (node_id, right, 0)
        } else {
            (children[idx - 1], node_id, idx - 1)
        };

        let combined = self.store.get(left)?.count() + self.store.get(right)?.count();
        let fits = if is_leaf {
            combined <= self.max_keys
        } else {
            combined < self.max_keys
        };

        if fits {
            self.merge(parent_id, sep, left, right)?;
            self.rebalance(parent_id)
        } else if left == node_id {
            self.borrow_from_right(parent_id, sep, left, right)
        } else {
            self.borrow_from_left(parent_id, sep, left, right)
        }
    }

    /// Drop an empty root. An internal root hands over to its only child.
    fn collapse_root(&mut self, root_id: NodeId) -> Result<()> {
        let root = self.store.get(root_id)?;
        if root.count() > 0 {
            return Ok(());
        }

        if root.is_leaf() {
            self.store.release(root_id)?;
            self.root = None;
            debug!("last entry removed, tree is empty");
        } else {
            let child = *root
                .children()?
                .first()
                .ok_or_else(|| Error::invariant(format!("{} has no children", root_id)))?;
            self.store.release(root_id)?;
            self.store.get_mut(child)?.parent = None;
            self.root = Some(child);
            debug!(root = %child, "tree lost a level");
        }
        Ok(())
    }

    /// Fold `right` into `left` and drop the separator between them.
    fn merge(&mut self, parent_id: NodeId, sep: usize, left: NodeId, right: NodeId) -> Result<()> {
        let separator = {
            let parent = self.store.get_mut(parent_id)?;
            if sep >= parent.count() {
                return Err(Error::invariant(format!(
                    "separator {} out of range in {}",
                    sep, parent_id
                )));
            }
            parent.children_mut()?.remove(sep + 1);
            parent.keys.remove(sep)
        };

        let Node { keys, body, .. } = self.store.release(right)?;
        match body {
            NodeBody::Leaf { locators, next } => {
                let node = self.store.get_mut(left)?;
                node.keys.extend(keys);
                node.locators_mut()?.extend(locators);
                node.set_next_leaf(next)?;
            }
            NodeBody::Internal { children } => {
                for &child in &children {
                    self.store.get_mut(child)?.parent = Some(left);
                }
                let node = self.store.get_mut(left)?;
                node.keys.push(separator);
                node.keys.extend(keys);
                node.children_mut()?.extend(children);
            }
        }

        debug!(into = %left, released = %right, "merged siblings");
        Ok(())
    }

    /// Move the first entry of `right` to the end of `left`.
    fn borrow_from_right(
        &mut self,
        parent_id: NodeId,
        sep: usize,
        left: NodeId,
        right: NodeId,
    ) -> Result<()> {
        let old_separator = self.separator(parent_id, sep)?;

        let (new_separator, moved_child) = {
            let (l, r) = self.store.pair_mut(left, right)?;
            if r.count() == 0 {
                return Err(Error::invariant(format!("borrow from empty {}", right)));
            }

            if l.is_leaf() {
                let (key, locator) = r.remove_entry(0)?;
                l.keys.push(key);
                l.locators_mut()?.push(locator);
                let first = r
                    .keys
                    .first()
                    .cloned()
                    .ok_or_else(|| Error::invariant(format!("{} emptied by a borrow", right)))?;
                (first, None)
            } else {
                let child = r.children_mut()?.remove(0);
                l.keys.push(old_separator);
                l.children_mut()?.push(child);
                (r.keys.remove(0), Some(child))
            }
        };

        if let Some(child) = moved_child {
            self.store.get_mut(child)?.parent = Some(left);
        }
        self.store.get_mut(parent_id)?.keys[sep] = new_separator;
        debug!(from = %right, to = %left, "redistributed one entry leftward");
        Ok(())
    }

    /// Move the last entry of `left` to the front of `right`.
    fn borrow_from_left(
        &mut self,
        parent_id: NodeId,
        sep: usize,
        left: NodeId,
        right: NodeId,
    ) -> Result<()> {
        let old_separator = self.separator(parent_id, sep)?;

        let (new_separator, moved_child) = {
            let (l, r) = self.store.pair_mut(left, right)?;
            let last = l
                .count()
                .checked_sub(1)
                .ok_or_else(|| Error::invariant(format!("borrow from empty {}", left)))?;

            if l.is_leaf() {
                let (key, locator) = l.remove_entry(last)?;
                r.keys.insert(0, key.clone());
                r.locators_mut()?.insert(0, locator);
                (key, None)
            } else {
                let child = l
                    .children_mut()?
                    .pop()
                    .ok_or_else(|| Error::invariant(format!("{} has no children", left)))?;
                r.keys.insert(0, old_separator);
                r.children_mut()?.insert(0, child);
                (l.keys.remove(last), Some(child))
            }
        };

        if let Some(child) = moved_child {
            self.store.get_mut(child)?.parent = Some(right);
        }
        self.store.get_mut(parent_id)?.keys[sep] = new_separator;
        debug!(from = %left, to = %right, "redistributed one entry rightward");
        Ok(())
    }

    fn separator(&self, parent_id: NodeId, sep: usize) -> Result<Key> {
        self.store
            .get(parent_id)?
            .keys
            .get(sep)
            .cloned()
            .ok_or_else(|| Error::invariant(format!("separator {} out of range in {}", sep, parent_id)))
    }
}
