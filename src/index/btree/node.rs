//! Tree nodes and their handles.

use std::fmt;

use super::key::{Key, RowLocator};
use crate::common::{Error, Result};

/// Stable handle of a node inside a [`NodeStore`](super::store::NodeStore).
///
/// Handles are reused after a node is released, so holding one across a
/// structural change is a logic error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({})", self.0)
    }
}

#[derive(Debug)]
pub(crate) enum NodeBody {
    /// `locators[i]` belongs to `keys[i]`.
    Leaf {
        locators: Vec<RowLocator>,
        next: Option<NodeId>,
    },
    /// `children.len() == keys.len() + 1`.
    Internal { children: Vec<NodeId> },
}

/// A leaf or internal node.
///
/// `parent` is a back-reference used only while propagating splits and
/// underflows upward. Ownership of every node stays with the store.
#[derive(Debug)]
pub(crate) struct Node {
    pub(crate) keys: Vec<Key>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) body: NodeBody,
}

impl Node {
    pub(crate) fn leaf(parent: Option<NodeId>) -> Self {
        Self {
            keys: Vec::new(),
            parent,
            body: NodeBody::Leaf {
                locators: Vec::new(),
                next: None,
            },
        }
    }

    pub(crate) fn internal(parent: Option<NodeId>) -> Self {
        Self {
            keys: Vec::new(),
            parent,
            body: NodeBody::Internal {
                children: Vec::new(),
            },
        }
    }

    #[inline]
    pub(crate) fn is_leaf(&self) -> bool {
        matches!(self.body, NodeBody::Leaf { .. })
    }

    #[inline]
    pub(crate) fn count(&self) -> usize {
        self.keys.len()
    }

    pub(crate) fn locators(&self) -> Result<&Vec<RowLocator>> {
        match &self.body {
            NodeBody::Leaf { locators, .. } => Ok(locators),
            NodeBody::Internal { .. } => Err(Error::invariant("expected a leaf node")),
        }
    }

    pub(crate) fn locators_mut(&mut self) -> Result<&mut Vec<RowLocator>> {
        match &mut self.body {
            NodeBody::Leaf { locators, .. } => Ok(locators),
            NodeBody::Internal { .. } => Err(Error::invariant("expected a leaf node")),
        }
    }

    pub(crate) fn next_leaf(&self) -> Result<Option<NodeId>> {
        match &self.body {
            NodeBody::Leaf { next, .. } => Ok(*next),
            NodeBody::Internal { .. } => Err(Error::invariant("expected a leaf node")),
        }
    }

    pub(crate) fn set_next_leaf(&mut self, new_next: Option<NodeId>) -> Result<()> {
        match &mut self.body {
            NodeBody::Leaf { next, .. } => {
                *next = new_next;
                Ok(())
            }
            NodeBody::Internal { .. } => Err(Error::invariant("expected a leaf node")),
        }
    }

    pub(crate) fn children(&self) -> Result<&Vec<NodeId>> {
        match &self.body {
            NodeBody::Internal { children } => Ok(children),
            NodeBody::Leaf { .. } => Err(Error::invariant("expected an internal node")),
        }
    }

    pub(crate) fn children_mut(&mut self) -> Result<&mut Vec<NodeId>> {
        match &mut self.body {
            NodeBody::Internal { children } => Ok(children),
            NodeBody::Leaf { .. } => Err(Error::invariant("expected an internal node")),
        }
    }

    /// Position of `child` among this node's children.
    pub(crate) fn child_index(&self, child: NodeId) -> Result<usize> {
        self.children()?
            .iter()
            .position(|&c| c == child)
            .ok_or_else(|| Error::invariant(format!("{} is not a child of its parent", child)))
    }

    /// Insert into a leaf after any entries with an equal key.
    pub(crate) fn insert_entry(&mut self, key: Key, locator: RowLocator) -> Result<()> {
        let pos = self.keys.partition_point(|k| *k <= key);
        self.locators_mut()?.insert(pos, locator);
        self.keys.insert(pos, key);
        Ok(())
    }

    /// Remove entry `index` from a leaf.
    pub(crate) fn remove_entry(&mut self, index: usize) -> Result<(Key, RowLocator)> {
        if index >= self.keys.len() {
            return Err(Error::invariant(format!(
                "entry {} out of range for leaf of {}",
                index,
                self.keys.len()
            )));
        }
        let locator = self.locators_mut()?.remove(index);
        Ok((self.keys.remove(index), locator))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leaf_insert_keeps_order_and_pairs() {
        let mut leaf = Node::leaf(None);
        for (k, slot) in [(20, 2), (10, 1), (30, 3), (20, 4)] {
            leaf.insert_entry(Key::Int(k), RowLocator::new(0, slot)).unwrap();
        }

        let keys: Vec<String> = leaf.keys.iter().map(|k| k.to_string()).collect();
        assert_eq!(keys, ["10", "20", "20", "30"]);
        // Equal keys keep insertion order.
        let slots: Vec<u32> = leaf.locators().unwrap().iter().map(|l| l.slot).collect();
        assert_eq!(slots, [1, 2, 4, 3]);
    }

    #[test]
    fn test_remove_entry() {
        let mut leaf = Node::leaf(None);
        leaf.insert_entry(Key::Int(1), RowLocator::new(0, 1)).unwrap();

        let (key, loc) = leaf.remove_entry(0).unwrap();
        assert_eq!(key, Key::Int(1));
        assert_eq!(loc, RowLocator::new(0, 1));
        assert!(leaf.remove_entry(0).is_err());
    }

    #[test]
    fn test_wrong_body_is_invariant_error() {
        let mut internal = Node::internal(None);
        assert!(!internal.is_leaf());
        assert!(matches!(
            internal.locators(),
            Err(Error::CapacityInvariantViolation(_))
        ));
        assert!(internal.set_next_leaf(None).is_err());
        assert!(Node::leaf(None).children().is_err());
    }

    #[test]
    fn test_child_index() {
        let mut internal = Node::internal(None);
        internal
            .children_mut()
            .unwrap()
            .extend([NodeId(4), NodeId(7)]);
        assert_eq!(internal.child_index(NodeId(7)).unwrap(), 1);
        assert!(internal.child_index(NodeId(9)).is_err());
    }
}
