//! Storage layer - the paged file and page formats.
//!
//! - [`DiskManager`] - Block I/O against a single file
//! - [`page`] - Page types and layouts

mod disk_manager;
pub mod page;

pub use disk_manager::DiskManager;
