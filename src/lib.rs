//! rowindexdb - an embedded B+-tree index over a paged file.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          rowindexdb                             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │                Index Layer (index/)                      │   │
//! │  │   BTreeIndex → BPlusTree → Navigator / Insert / Delete   │   │
//! │  │          TreeScan over the leaf chain, NodeStore arena   │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │                Buffer Pool (buffer/)                     │   │
//! │  │   ┌─────────────────────────────────────────────────┐   │   │
//! │  │   │   Eviction Policies: FIFO | LRU | CLOCK | LRU-K  │   │   │
//! │  │   └─────────────────────────────────────────────────┘   │   │
//! │  │      BufferPoolManager + Frame + Statistics              │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │                Storage Layer (storage/)                  │   │
//! │  │           DiskManager + Page + PageHeader                │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//! - [`common`] - Shared primitives (PageId, FrameId, Error, config)
//! - [`storage`] - Disk I/O and page formats
//! - [`buffer`] - Buffer pool management and eviction policies
//! - [`index`] - The B+-tree index
//!
//! # Quick Start
//! ```no_run
//! use rowindexdb::index::{BTreeIndex, Key, KeyType, RowLocator};
//!
//! BTreeIndex::create("users.idx", KeyType::Int, 4).unwrap();
//! let mut index = BTreeIndex::open("users.idx").unwrap();
//!
//! index.insert(Key::Int(7), RowLocator::new(1, 0)).unwrap();
//! for entry in index.open_scan() {
//!     let (key, locator) = entry.unwrap();
//!     println!("{} -> {}", key, locator);
//! }
//! index.close().unwrap();
//! ```

pub mod buffer;
pub mod common;
pub mod index;
pub mod storage;

// Re-export commonly used items at crate root for convenience
pub use common::config::{DuplicatePolicy, IndexOptions, PAGE_SIZE};
pub use common::{Error, FrameId, PageId, Result};

pub use buffer::{BufferPoolManager, BufferPoolStats, Frame, ReplacementPolicy, StatsSnapshot};
pub use index::{BPlusTree, BTreeIndex, Key, KeyType, RowLocator, TreeScan};
pub use storage::page::{Page, PageHeader, PageType};
pub use storage::DiskManager;
