//! B+-tree index.
//!
//! # Layout
//! - [`key`] - typed keys, their total order, row locators
//! - `node` / `store` - nodes and the arena that owns them
//! - [`BPlusTree`] - the tree handle and navigator (`tree.rs`), insertion
//!   (`insert.rs`), deletion (`delete.rs`), dump and checks (`inspect.rs`)
//! - [`TreeScan`] - ascending cursor over the leaf chain
//! - [`meta`] - the metadata page at the start of an index file
//! - [`BTreeIndex`] - a tree bound to its index file and buffer pool
//!
//! Only the metadata page is persisted. The tree body lives in memory for
//! as long as the index is open.

mod delete;
mod insert;
mod inspect;
pub mod key;
pub mod meta;
mod node;
mod scan;
mod store;
mod tree;

use std::path::{Path, PathBuf};

use tracing::info;

use crate::buffer::BufferPoolManager;
use crate::common::config::{DuplicatePolicy, IndexOptions};
use crate::common::Result;
use crate::storage::page::Page;
use crate::storage::DiskManager;

pub use key::{Key, KeyType, RowLocator};
pub use meta::{IndexMeta, META_PAGE_ID};
pub use scan::TreeScan;
pub use tree::BPlusTree;

/// An open index: an in-memory tree plus the file that describes it.
///
/// # Example
/// ```no_run
/// use rowindexdb::index::btree::{BTreeIndex, Key, KeyType, RowLocator};
///
/// BTreeIndex::create("orders.idx", KeyType::Int, 4).unwrap();
/// let mut index = BTreeIndex::open("orders.idx").unwrap();
/// index.insert(Key::Int(42), RowLocator::new(3, 1)).unwrap();
/// assert_eq!(index.find(&Key::Int(42)).unwrap(), RowLocator::new(3, 1));
/// index.close().unwrap();
/// ```
pub struct BTreeIndex {
    tree: BPlusTree,
    pool: BufferPoolManager,
    path: PathBuf,
}

impl BTreeIndex {
    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Create an index file that allows duplicate keys.
    pub fn create<P: AsRef<Path>>(path: P, key_type: KeyType, fanout: usize) -> Result<()> {
        Self::create_with_policy(path, key_type, fanout, DuplicatePolicy::Allow)
    }

    /// Create an index file and write its metadata page. The duplicate
    /// policy is recorded there and applies every time the index is opened.
    ///
    /// # Errors
    /// - `Error::InvalidArgument` for an unusable fanout or key type
    /// - `Error::Io` if the file already exists or can't be written
    pub fn create_with_policy<P: AsRef<Path>>(
        path: P,
        key_type: KeyType,
        fanout: usize,
        duplicates: DuplicatePolicy,
    ) -> Result<()> {
        let path = path.as_ref();
        // Validates fanout and key type before touching the filesystem.
        BPlusTree::new(key_type, fanout)?;

        let mut page = Page::new();
        IndexMeta::new(key_type, fanout)
            .with_duplicates(duplicates)
            .write_to(&mut page)?;

        let mut disk = DiskManager::create(path)?;
        disk.ensure_capacity(1)?;
        disk.write_page(META_PAGE_ID, &page)?;
        disk.close()?;

        info!(path = %path.display(), %key_type, fanout, ?duplicates, "created index");
        Ok(())
    }

    /// Open an index with default options.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_options(path, &IndexOptions::default())
    }

    /// Open an index, reading key type, fanout and duplicate policy from its
    /// metadata page. `options.duplicates` is ignored in favor of the
    /// recorded policy.
    ///
    /// # Errors
    /// - `Error::Io` if the file can't be opened
    /// - `Error::PageNotFound` if the file has no metadata page
    /// - `Error::CorruptedPage` if the metadata page fails validation
    pub fn open_with_options<P: AsRef<Path>>(path: P, options: &IndexOptions) -> Result<Self> {
        let path = path.as_ref();
        let disk = DiskManager::open(path)?;
        let pool = BufferPoolManager::new(options.pool_size, disk, options.replacement)?;

        let meta = {
            let guard = pool.fetch_page_read(META_PAGE_ID)?;
            IndexMeta::read_from(&guard)?
        };
        let options = options.clone().with_duplicates(meta.duplicates);
        let tree = BPlusTree::with_options(meta.key_type, meta.fanout, &options)?;

        info!(
            path = %path.display(),
            key_type = %meta.key_type,
            fanout = meta.fanout,
            duplicates = ?meta.duplicates,
            "opened index"
        );
        Ok(Self {
            tree,
            pool,
            path: path.to_path_buf(),
        })
    }

    /// Flush the pool, close the file and release every node.
    pub fn close(self) -> Result<()> {
        let Self { tree, pool, path } = self;
        pool.into_disk_manager()?.close()?;
        info!(
            path = %path.display(),
            entries = tree.entry_count(),
            nodes = tree.node_count(),
            "closed index"
        );
        Ok(())
    }

    /// Remove an index file.
    pub fn destroy<P: AsRef<Path>>(path: P) -> Result<()> {
        DiskManager::destroy(path)
    }

    // ========================================================================
    // Entries
    // ========================================================================

    pub fn insert(&mut self, key: Key, locator: RowLocator) -> Result<()> {
        self.tree.insert(key, locator)
    }

    pub fn delete(&mut self, key: &Key) -> Result<RowLocator> {
        self.tree.delete(key)
    }

    pub fn find(&self, key: &Key) -> Result<RowLocator> {
        self.tree.find(key)
    }

    pub fn find_all(&self, key: &Key) -> Result<Vec<RowLocator>> {
        self.tree.find_all(key)
    }

    pub fn contains(&self, key: &Key) -> Result<bool> {
        self.tree.contains(key)
    }

    pub fn open_scan(&self) -> TreeScan<'_> {
        self.tree.open_scan()
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    pub fn key_type(&self) -> KeyType {
        self.tree.key_type()
    }

    pub fn fanout(&self) -> usize {
        self.tree.fanout()
    }

    pub fn node_count(&self) -> usize {
        self.tree.node_count()
    }

    pub fn entry_count(&self) -> usize {
        self.tree.entry_count()
    }

    pub fn height(&self) -> Result<usize> {
        self.tree.height()
    }

    pub fn dump_tree(&self) -> Result<String> {
        self.tree.dump_tree()
    }

    pub fn check_invariants(&self) -> Result<()> {
        self.tree.check_invariants()
    }

    pub fn tree(&self) -> &BPlusTree {
        &self.tree
    }

    pub fn buffer_pool(&self) -> &BufferPoolManager {
        &self.pool
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
