//! Configuration for rowindexdb.
//!
//! Compile-time constants live at the top of the module; per-index runtime
//! knobs are collected in [`IndexOptions`].

use crate::buffer::replacer::ReplacementPolicy;

/// Size of a page in bytes (4KB).
///
/// Matches the OS page size on most systems, so a page maps onto a single
/// block read or write.
pub const PAGE_SIZE: usize = 4096;

/// Maximum number of pages addressable with a u32 `PageId`.
pub const MAX_PAGES: u64 = (u32::MAX as u64) + 1;

/// Number of frames an index opens its buffer pool with.
pub const DEFAULT_POOL_SIZE: usize = 10;

/// Smallest legal fanout.
///
/// With fanout 2 an internal split would leave one side with zero keys.
pub const MIN_FANOUT: usize = 3;

/// Largest accepted fanout.
pub const MAX_FANOUT: usize = 1 << 16;

/// Default history depth for the LRU-K replacer.
pub const DEFAULT_LRU_K: usize = 2;

/// What `insert` does when the key is already present.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum DuplicatePolicy {
    /// Add another entry under the same key (multimap).
    #[default]
    Allow,
    /// Fail with `InvalidArgument`.
    Reject,
}

impl DuplicatePolicy {
    /// Code stored in an index header.
    pub(crate) fn code(self) -> i32 {
        match self {
            DuplicatePolicy::Allow => 0,
            DuplicatePolicy::Reject => 1,
        }
    }

    pub(crate) fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(DuplicatePolicy::Allow),
            1 => Some(DuplicatePolicy::Reject),
            _ => None,
        }
    }
}

/// Runtime options applied when an index is opened.
///
/// # Example
/// ```
/// use rowindexdb::common::config::{DuplicatePolicy, IndexOptions};
/// use rowindexdb::buffer::replacer::ReplacementPolicy;
///
/// let opts = IndexOptions::default()
///     .with_pool_size(4)
///     .with_replacement(ReplacementPolicy::Lru)
///     .with_duplicates(DuplicatePolicy::Reject);
/// assert_eq!(opts.pool_size, 4);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexOptions {
    /// Frames in the index's buffer pool.
    pub pool_size: usize,
    /// Eviction policy of the buffer pool.
    pub replacement: ReplacementPolicy,
    /// Duplicate key handling. An index file records this when it is
    /// created; reopening it uses the recorded policy instead.
    pub duplicates: DuplicatePolicy,
    /// Upper bound on live tree nodes, `None` for unbounded.
    pub max_nodes: Option<usize>,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            pool_size: DEFAULT_POOL_SIZE,
            replacement: ReplacementPolicy::Clock,
            duplicates: DuplicatePolicy::Allow,
            max_nodes: None,
        }
    }
}

impl IndexOptions {
    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    pub fn with_replacement(mut self, replacement: ReplacementPolicy) -> Self {
        self.replacement = replacement;
        self
    }

    pub fn with_duplicates(mut self, duplicates: DuplicatePolicy) -> Self {
        self.duplicates = duplicates;
        self
    }

    pub fn with_max_nodes(mut self, max_nodes: usize) -> Self {
        self.max_nodes = Some(max_nodes);
        self
    }
}

/// Check that a fanout is usable.
pub(crate) fn validate_fanout(fanout: usize) -> crate::common::Result<()> {
    if !(MIN_FANOUT..=MAX_FANOUT).contains(&fanout) {
        return Err(crate::common::Error::invalid(format!(
            "fanout {} out of range [{}, {}]",
            fanout, MIN_FANOUT, MAX_FANOUT
        )));
    }
    Ok(())
}
