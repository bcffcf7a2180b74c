//! Buffer pool management.
//!
//! The buffer pool is the page cache between the index and the paged file.
//! It owns a fixed set of frames, each holding one page.
//!
//! # Components
//! - [`BufferPoolManager`] - The page cache
//! - [`Frame`] - A slot in the pool holding a page + metadata
//! - [`PageReadGuard`] / [`PageWriteGuard`] - RAII pins
//! - [`BufferPoolStats`] - Hit/miss/eviction and I/O counters
//! - [`replacer`] - Eviction policies

mod buffer_pool_manager;
mod frame;
mod page_guard;
pub mod replacer;
mod stats;

pub use buffer_pool_manager::BufferPoolManager;
pub use frame::Frame;
pub use page_guard::{PageReadGuard, PageWriteGuard};
pub use replacer::ReplacementPolicy;
pub use stats::{BufferPoolStats, StatsSnapshot};
