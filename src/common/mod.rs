//! Common types and utilities shared across rowindexdb.
//!
//! - Configuration constants and [`config::IndexOptions`]
//! - The crate-wide [`Error`] type
//! - Identifiers for pages on disk and frames in the buffer pool

pub mod config;
pub mod error;
mod frame_id;
mod page_id;

pub use error::{Error, Result};
pub use frame_id::FrameId;
pub use page_id::PageId;
