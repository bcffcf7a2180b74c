//! Tree dump and structural checks.

use std::collections::HashMap;
use std::fmt;

use super::key::Key;
use super::node::NodeId;
use super::tree::BPlusTree;
use crate::common::config::DuplicatePolicy;
use crate::common::{Error, Result};

impl BPlusTree {
    /// Render the tree one node per line, depth-first pre-order.
    ///
    /// Nodes are numbered in visiting order. An internal node prints as
    /// `(pos)[c0,k0,c1,...,cn]` with child positions between its keys. A
    /// leaf prints as `(pos)[p.s,k0,p.s,k1,...,next]`: locator and key pairs
    /// followed by the position of the next leaf, if any.
    ///
    /// An empty tree renders as an empty string.
    pub fn dump_tree(&self) -> Result<String> {
        let order = self.preorder()?;
        let positions: HashMap<NodeId, usize> =
            order.iter().enumerate().map(|(pos, &id)| (id, pos)).collect();
        let pos_of = |id: &NodeId| {
            positions
                .get(id)
                .copied()
                .ok_or_else(|| Error::invariant(format!("{} unreachable from the root", id)))
        };

        let mut out = String::new();
        for (pos, &id) in order.iter().enumerate() {
            let node = self.store.get(id)?;
            let mut fields = Vec::with_capacity(node.count() * 2 + 1);

            if node.is_leaf() {
                for (key, locator) in node.keys.iter().zip(node.locators()?) {
                    fields.push(locator.to_string());
                    fields.push(key.to_string());
                }
                if let Some(next) = node.next_leaf()? {
                    fields.push(pos_of(&next)?.to_string());
                }
            } else {
                let children = node.children()?;
                for (i, child) in children.iter().enumerate() {
                    fields.push(pos_of(child)?.to_string());
                    if let Some(key) = node.keys.get(i) {
                        fields.push(key.to_string());
                    }
                }
            }

            out.push_str(&format!("({})[{}]\n", pos, fields.join(",")));
        }
        Ok(out)
    }

    fn preorder(&self) -> Result<Vec<NodeId>> {
        let mut order = Vec::with_capacity(self.store.len());
        let mut stack: Vec<NodeId> = self.root.into_iter().collect();
        while let Some(id) = stack.pop() {
            order.push(id);
            let node = self.store.get(id)?;
            if !node.is_leaf() {
                stack.extend(node.children()?.iter().rev());
            }
        }
        Ok(order)
    }

    /// Verify the structural invariants of the tree.
    ///
    /// Checks occupancy bounds, equal leaf depth, separator ordering and
    /// bounds, parent back-references, the leaf chain, and that the entry
    /// and node counts match what is reachable.
    ///
    /// # Errors
    /// `Error::CapacityInvariantViolation` naming the first breach found.
    pub fn check_invariants(&self) -> Result<()> {
        let Some(root) = self.root else {
            if self.entry_count != 0 || self.store.len() != 0 {
                return Err(Error::invariant(format!(
                    "empty tree holds {} entries in {} nodes",
                    self.entry_count,
                    self.store.len()
                )));
            }
            return Ok(());
        };

        if self.store.get(root)?.parent.is_some() {
            return Err(Error::invariant("root has a parent"));
        }

        let mut walk = Walk::default();
        self.check_node(root, None, None, 1, &mut walk)?;

        if walk.nodes != self.store.len() {
            return Err(Error::invariant(format!(
                "{} nodes reachable, {} allocated",
                walk.nodes,
                self.store.len()
            )));
        }
        self.check_leaf_chain(&walk.leaves)
    }

    fn check_node(
        &self,
        id: NodeId,
        lower: Option<&Key>,
        upper: Option<&Key>,
        depth: usize,
        walk: &mut Walk,
    ) -> Result<()> {
        let node = self.store.get(id)?;
        walk.nodes += 1;

        let count = node.count();
        let is_root = Some(id) == self.root;
        if count > self.max_keys || (!is_root && count < self.min_keys()) || (is_root && count == 0) {
            return Err(Error::invariant(format!(
                "{} holds {} keys, allowed {}..={}",
                id,
                count,
                if is_root { 1 } else { self.min_keys() },
                self.max_keys
            )));
        }

        let strict = self.duplicates == DuplicatePolicy::Reject;
        for pair in node.keys.windows(2) {
            if pair[0] > pair[1] || (strict && pair[0] == pair[1]) {
                return Err(Error::invariant(format!(
                    "{} keys out of order: {} then {}",
                    id, pair[0], pair[1]
                )));
            }
        }
        let in_bounds = |k: &Key| lower.map_or(true, |lo| lo <= k) && upper.map_or(true, |hi| k <= hi);
        if let Some(k) = node.keys.iter().find(|k| !in_bounds(k)) {
            return Err(Error::invariant(format!("{} key {} escapes its separators", id, k)));
        }

        if node.is_leaf() {
            if node.locators()?.len() != count {
                return Err(Error::invariant(format!("{} key/locator count mismatch", id)));
            }
            match walk.leaf_depth {
                Some(d) if d != depth => {
                    return Err(Error::invariant(format!(
                        "{} at depth {}, other leaves at {}",
                        id, depth, d
                    )));
                }
                _ => walk.leaf_depth = Some(depth),
            }
            walk.leaves.push(id);
            return Ok(());
        }

        let children = node.children()?;
        if children.len() != count + 1 {
            return Err(Error::invariant(format!(
                "{} has {} keys but {} children",
                id,
                count,
                children.len()
            )));
        }
        for (i, &child) in children.iter().enumerate() {
            if self.store.get(child)?.parent != Some(id) {
                return Err(Error::invariant(format!("{} does not point back to {}", child, id)));
            }
            let lo = if i == 0 { lower } else { node.keys.get(i - 1) };
            let hi = node.keys.get(i).or(upper);
            self.check_node(child, lo, hi, depth + 1, walk)?;
        }
        Ok(())
    }

    fn check_leaf_chain(&self, leaves: &[NodeId]) -> Result<()> {
        let mut chained = 0;
        let mut entries = 0;
        let mut previous: Option<&Key> = None;
        let mut cursor = leaves.first().copied();

        while let Some(id) = cursor {
            if leaves.get(chained) != Some(&id) {
                return Err(Error::invariant(format!(
                    "leaf chain reaches {} out of key order",
                    id
                )));
            }
            let leaf = self.store.get(id)?;
            if let (Some(prev), Some(first)) = (previous, leaf.keys.first()) {
                if first < prev {
                    return Err(Error::invariant(format!("leaf chain descends at {}", id)));
                }
            }
            previous = leaf.keys.last().or(previous);
            entries += leaf.count();
            chained += 1;
            cursor = leaf.next_leaf()?;
        }

        if chained != leaves.len() {
            return Err(Error::invariant(format!(
                "leaf chain links {} of {} leaves",
                chained,
                leaves.len()
            )));
        }
        if entries != self.entry_count {
            return Err(Error::invariant(format!(
                "entry count {} but leaf chain holds {}",
                self.entry_count, entries
            )));
        }
        Ok(())
    }
}

#[derive(Default)]
struct Walk {
    nodes: usize,
    leaf_depth: Option<usize>,
    leaves: Vec<NodeId>,
}

impl fmt::Display for BPlusTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dump = self.dump_tree().map_err(|_| fmt::Error)?;
        f.write_str(&dump)
    }
}
