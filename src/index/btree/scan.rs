//! Scan cursor: forward iteration over the leaf chain.

use super::key::{Key, RowLocator};
use super::node::NodeId;
use super::tree::BPlusTree;
use crate::common::{Error, Result};

/// Ascending scan over every entry of a tree.
///
/// The cursor borrows the tree, so the tree can't be mutated while a scan
/// is open. It yields exactly as many entries as the tree held when the
/// scan was opened; the leaf chain ending earlier than that is reported as
/// `Error::CapacityInvariantViolation`.
///
/// # Example
/// ```
/// use rowindexdb::index::btree::{BPlusTree, Key, KeyType, RowLocator};
///
/// let mut tree = BPlusTree::new(KeyType::Int, 3).unwrap();
/// for k in [30, 10, 20] {
///     tree.insert(Key::Int(k), RowLocator::new(k as u32, 0)).unwrap();
/// }
///
/// let keys: Vec<String> = tree
///     .open_scan()
///     .map(|entry| entry.unwrap().0.to_string())
///     .collect();
/// assert_eq!(keys, ["10", "20", "30"]);
/// ```
#[derive(Debug)]
pub struct TreeScan<'a> {
    tree: &'a BPlusTree,
    /// `None` until the first call positions the cursor.
    leaf: Option<NodeId>,
    index: usize,
    yielded: usize,
    total: usize,
    started: bool,
    closed: bool,
}

impl BPlusTree {
    /// Open a cursor before the first entry.
    pub fn open_scan(&self) -> TreeScan<'_> {
        TreeScan {
            tree: self,
            leaf: None,
            index: 0,
            yielded: 0,
            total: self.entry_count,
            started: false,
            closed: false,
        }
    }
}

impl<'a> TreeScan<'a> {
    /// Advance to the next entry.
    ///
    /// # Errors
    /// `Error::NoMoreEntries` once every entry has been returned, or after
    /// [`close`](Self::close).
    pub fn next_entry(&mut self) -> Result<(&'a Key, RowLocator)> {
        if self.closed || self.yielded >= self.total {
            return Err(Error::NoMoreEntries);
        }

        let tree = self.tree;
        if !self.started {
            self.leaf = Some(tree.leftmost_leaf()?);
            self.started = true;
        }

        loop {
            let id = self.leaf.ok_or_else(|| {
                Error::invariant(format!(
                    "leaf chain ended after {} of {} entries",
                    self.yielded, self.total
                ))
            })?;
            let node = tree.store.get(id)?;

            if let Some(key) = node.keys.get(self.index) {
                let locator = node
                    .locators()?
                    .get(self.index)
                    .copied()
                    .ok_or_else(|| Error::invariant("leaf key without locator"))?;
                self.index += 1;
                self.yielded += 1;
                return Ok((key, locator));
            }

            self.leaf = node.next_leaf()?;
            self.index = 0;
        }
    }

    /// Advance and return only the locator.
    pub fn next_locator(&mut self) -> Result<RowLocator> {
        self.next_entry().map(|(_, locator)| locator)
    }

    /// Entries left before the scan is exhausted.
    pub fn remaining(&self) -> usize {
        if self.closed {
            0
        } else {
            self.total - self.yielded
        }
    }

    /// Release cursor state. Closing twice is harmless.
    pub fn close(&mut self) {
        self.closed = true;
        self.leaf = None;
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl<'a> Iterator for TreeScan<'a> {
    type Item = Result<(&'a Key, RowLocator)>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_entry() {
            Err(Error::NoMoreEntries) => None,
            Err(e) => {
                self.close();
                Some(Err(e))
            }
            ok => Some(ok),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining()))
    }
}
