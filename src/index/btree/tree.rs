//! The in-memory B+-tree and its navigator.

use super::key::{Key, KeyType, RowLocator};
use super::node::NodeId;
use super::store::NodeStore;
use crate::common::config::{validate_fanout, DuplicatePolicy, IndexOptions};
use crate::common::{Error, Result};

/// A B+-tree mapping typed keys to row locators.
///
/// This is the tree handle: it owns the node store, the root handle and
/// the entry count. Mutation lives in the insertion and deletion engines
/// (`insert.rs`, `delete.rs`); iteration in `scan.rs`.
///
/// # Node occupancy
/// With `max_keys = fanout - 1`, every non-root node keeps between
/// `min_keys = ceil((max_keys + 1) / 2) - 1` and `max_keys` keys.
///
/// # Example
/// ```
/// use rowindexdb::index::btree::{BPlusTree, Key, KeyType, RowLocator};
///
/// let mut tree = BPlusTree::new(KeyType::Int, 3).unwrap();
/// tree.insert(Key::Int(10), RowLocator::new(1, 0)).unwrap();
/// assert_eq!(tree.find(&Key::Int(10)).unwrap(), RowLocator::new(1, 0));
/// ```
#[derive(Debug)]
pub struct BPlusTree {
    pub(crate) key_type: KeyType,
    pub(crate) max_keys: usize,
    pub(crate) entry_count: usize,
    pub(crate) root: Option<NodeId>,
    pub(crate) store: NodeStore,
    pub(crate) duplicates: DuplicatePolicy,
}

impl BPlusTree {
    /// Create an empty tree with default options.
    ///
    /// # Errors
    /// `Error::InvalidArgument` for a fanout outside the accepted range or a
    /// zero-length string key type.
    pub fn new(key_type: KeyType, fanout: usize) -> Result<Self> {
        Self::with_options(key_type, fanout, &IndexOptions::default())
    }

    pub fn with_options(key_type: KeyType, fanout: usize, options: &IndexOptions) -> Result<Self> {
        validate_fanout(fanout)?;
        if let KeyType::String { max_len: 0 } = key_type {
            return Err(Error::invalid("string keys need a non-zero length"));
        }

        Ok(Self {
            key_type,
            max_keys: fanout - 1,
            entry_count: 0,
            root: None,
            store: NodeStore::new(options.max_nodes),
            duplicates: options.duplicates,
        })
    }

    #[inline]
    pub fn key_type(&self) -> KeyType {
        self.key_type
    }

    /// Maximum number of children of an internal node.
    #[inline]
    pub fn fanout(&self) -> usize {
        self.max_keys + 1
    }

    #[inline]
    pub fn max_keys(&self) -> usize {
        self.max_keys
    }

    #[inline]
    pub fn min_keys(&self) -> usize {
        (self.max_keys + 1).div_ceil(2) - 1
    }

    /// Number of live (key, locator) pairs.
    #[inline]
    pub fn entry_count(&self) -> usize {
        self.entry_count
    }

    /// Number of allocated nodes, leaf and internal.
    #[inline]
    pub fn node_count(&self) -> usize {
        self.store.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    #[inline]
    pub fn duplicate_policy(&self) -> DuplicatePolicy {
        self.duplicates
    }

    /// Number of levels, 0 for an empty tree.
    pub fn height(&self) -> Result<usize> {
        let mut height = 0;
        let mut cursor = self.root;
        while let Some(id) = cursor {
            height += 1;
            let node = self.store.get(id)?;
            cursor = if node.is_leaf() {
                None
            } else {
                node.children()?.first().copied()
            };
        }
        Ok(height)
    }

    /// Release every node. The tree is empty afterwards.
    pub fn clear(&mut self) {
        self.store.clear();
        self.root = None;
        self.entry_count = 0;
    }

    // ========================================================================
    // Navigator
    // ========================================================================

    /// Descend to the leaf that `key` belongs in.
    ///
    /// At each internal node, follow the first child whose separator is
    /// greater than `key`, or the last child if there is none. New entries
    /// go here, after any existing entries with an equal key.
    ///
    /// # Errors
    /// `Error::EmptyTree` if there is no root.
    pub(crate) fn locate_leaf(&self, key: &Key) -> Result<NodeId> {
        self.descend(|keys| keys.partition_point(|k| k <= key))
    }

    /// Descend to the leftmost leaf that may hold `key`.
    ///
    /// Equal keys can sit on both sides of a separator once duplicates
    /// split across leaves, so lookups start here and walk the leaf chain.
    pub(crate) fn locate_first_leaf(&self, key: &Key) -> Result<NodeId> {
        self.descend(|keys| keys.partition_point(|k| k < key))
    }

    /// Descend along `child[0]` to the first leaf of the chain.
    pub(crate) fn leftmost_leaf(&self) -> Result<NodeId> {
        self.descend(|_| 0)
    }

    fn descend(&self, pick: impl Fn(&[Key]) -> usize) -> Result<NodeId> {
        let mut id = self.root.ok_or(Error::EmptyTree)?;
        loop {
            let node = self.store.get(id)?;
            if node.is_leaf() {
                return Ok(id);
            }
            let idx = pick(&node.keys);
            id = *node.children()?.get(idx).ok_or_else(|| {
                Error::invariant(format!("{} has no child {}", id, idx))
            })?;
        }
    }

    /// Find the leaf and slot of the first live entry equal to `key`.
    pub(crate) fn seek_exact(&self, key: &Key) -> Result<(NodeId, usize)> {
        let mut leaf_id = self.locate_first_leaf(key)?;
        loop {
            let leaf = self.store.get(leaf_id)?;
            for (i, k) in leaf.keys.iter().enumerate() {
                match k.cmp(key) {
                    std::cmp::Ordering::Less => continue,
                    std::cmp::Ordering::Equal => return Ok((leaf_id, i)),
                    std::cmp::Ordering::Greater => return Err(Error::KeyNotFound),
                }
            }
            leaf_id = leaf.next_leaf()?.ok_or(Error::KeyNotFound)?;
        }
    }

    /// Look up the locator stored under `key`.
    ///
    /// With duplicates, returns the locator of the first matching entry in
    /// key order.
    ///
    /// # Errors
    /// - `Error::InvalidArgument` if `key` doesn't match the key type
    /// - `Error::EmptyTree` if the tree has no entries
    /// - `Error::KeyNotFound` if no entry has this key
    pub fn find(&self, key: &Key) -> Result<RowLocator> {
        self.key_type.check(key)?;
        let (leaf_id, idx) = self.seek_exact(key)?;
        let leaf = self.store.get(leaf_id)?;
        leaf.locators()?
            .get(idx)
            .copied()
            .ok_or_else(|| Error::invariant("leaf key without locator"))
    }

    /// Whether any live entry has this key.
    pub fn contains(&self, key: &Key) -> Result<bool> {
        match self.find(key) {
            Ok(_) => Ok(true),
            Err(Error::KeyNotFound) | Err(Error::EmptyTree) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Every locator stored under `key`, in insertion order within a leaf.
    pub fn find_all(&self, key: &Key) -> Result<Vec<RowLocator>> {
        self.key_type.check(key)?;
        let (mut leaf_id, mut idx) = match self.seek_exact(key) {
            Ok(pos) => pos,
            Err(Error::KeyNotFound) | Err(Error::EmptyTree) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut found = Vec::new();
        loop {
            let leaf = self.store.get(leaf_id)?;
            let locators = leaf.locators()?;
            while idx < leaf.count() {
                if leaf.keys[idx] != *key {
                    return Ok(found);
                }
                found.push(locators[idx]);
                idx += 1;
            }
            match leaf.next_leaf()? {
                Some(next) => {
                    leaf_id = next;
                    idx = 0;
                }
                None => return Ok(found),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int_tree(fanout: usize, keys: &[i32]) -> BPlusTree {
        let mut tree = BPlusTree::new(KeyType::Int, fanout).unwrap();
        for &k in keys {
            tree.insert(Key::Int(k), RowLocator::new(k as u32, 0)).unwrap();
        }
        tree
    }

    #[test]
    fn test_new_rejects_bad_arguments() {
        assert!(matches!(
            BPlusTree::new(KeyType::Int, 2),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            BPlusTree::new(KeyType::String { max_len: 0 }, 4),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_min_keys() {
        assert_eq!(BPlusTree::new(KeyType::Int, 3).unwrap().min_keys(), 1);
        assert_eq!(BPlusTree::new(KeyType::Int, 4).unwrap().min_keys(), 1);
        assert_eq!(BPlusTree::new(KeyType::Int, 5).unwrap().min_keys(), 2);
        assert_eq!(BPlusTree::new(KeyType::Int, 6).unwrap().min_keys(), 2);
    }

    #[test]
    fn test_empty_tree_errors() {
        let tree = BPlusTree::new(KeyType::Int, 3).unwrap();
        assert!(matches!(tree.locate_leaf(&Key::Int(1)), Err(Error::EmptyTree)));
        assert!(matches!(tree.find(&Key::Int(1)), Err(Error::EmptyTree)));
        assert!(!tree.contains(&Key::Int(1)).unwrap());
        assert_eq!(tree.height().unwrap(), 0);
    }

    #[test]
    fn test_find_numeric_not_textual() {
        let tree = int_tree(3, &[-10, -1, 2, 9, 10, 100, 25]);
        for k in [-10, -1, 2, 9, 10, 100, 25] {
            assert_eq!(
                tree.find(&Key::Int(k)).unwrap(),
                RowLocator::new(k as u32, 0)
            );
        }
        assert!(matches!(tree.find(&Key::Int(11)), Err(Error::KeyNotFound)));
        assert!(matches!(tree.find(&Key::Int(-5)), Err(Error::KeyNotFound)));
    }

    #[test]
    fn test_find_wrong_key_type() {
        let tree = int_tree(3, &[1]);
        assert!(matches!(
            tree.find(&Key::from("1")),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_locate_leaf_descends_right_on_equal() {
        let tree = int_tree(3, &[10, 20, 30]);
        // Root separator is 30: equal keys go right, smaller keys go left.
        let left = tree.locate_leaf(&Key::Int(20)).unwrap();
        let right = tree.locate_leaf(&Key::Int(30)).unwrap();
        assert_ne!(left, right);
        assert_eq!(tree.locate_first_leaf(&Key::Int(30)).unwrap(), left);
        assert_eq!(tree.leftmost_leaf().unwrap(), left);
    }

    #[test]
    fn test_height_grows_with_splits() {
        let tree = int_tree(3, &[1]);
        assert_eq!(tree.height().unwrap(), 1);
        let tree = int_tree(3, &[1, 2, 3]);
        assert_eq!(tree.height().unwrap(), 2);
        let tree = int_tree(3, &[1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(tree.height().unwrap(), 3);
    }

    #[test]
    fn test_find_all_across_leaves() {
        let mut tree = BPlusTree::new(KeyType::Int, 3).unwrap();
        for slot in 0..5 {
            tree.insert(Key::Int(7), RowLocator::new(1, slot)).unwrap();
        }
        tree.insert(Key::Int(3), RowLocator::new(0, 0)).unwrap();
        tree.insert(Key::Int(9), RowLocator::new(2, 0)).unwrap();

        let mut slots: Vec<u32> = tree
            .find_all(&Key::Int(7))
            .unwrap()
            .iter()
            .map(|l| l.slot)
            .collect();
        slots.sort();
        assert_eq!(slots, [0, 1, 2, 3, 4]);
        assert!(tree.find_all(&Key::Int(8)).unwrap().is_empty());
    }

    #[test]
    fn test_clear() {
        let mut tree = int_tree(4, &[1, 2, 3, 4, 5, 6]);
        tree.clear();
        assert!(tree.is_empty());
        assert_eq!(tree.node_count(), 0);
        assert_eq!(tree.entry_count(), 0);
    }
}
