//! Index structures.
//!
//! - [`btree`] - B+-tree mapping typed keys to row locators

pub mod btree;

pub use btree::{BPlusTree, BTreeIndex, Key, KeyType, RowLocator, TreeScan};
