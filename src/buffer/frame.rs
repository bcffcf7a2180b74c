//! Frame - a slot in the buffer pool.
//!
//! A [`Frame`] holds a [`Page`] plus the bookkeeping the pool needs:
//! which page is resident, how many pins it has and whether it is dirty.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::common::PageId;
use crate::storage::page::Page;

/// One slot of the buffer pool.
///
/// Page bytes sit behind a `RwLock`; the metadata words are atomics so that
/// pin/unpin never contend with page readers. An empty frame stores
/// `PageId::INVALID`.
pub struct Frame {
    page: RwLock<Page>,
    page_id: AtomicU32,
    pin_count: AtomicU32,
    is_dirty: AtomicBool,
}

impl Frame {
    pub fn new() -> Self {
        Self {
            page: RwLock::new(Page::new()),
            page_id: AtomicU32::new(PageId::INVALID.0),
            pin_count: AtomicU32::new(0),
            is_dirty: AtomicBool::new(false),
        }
    }

    #[inline]
    pub fn page(&self) -> RwLockReadGuard<'_, Page> {
        self.page.read()
    }

    #[inline]
    pub fn page_mut(&self) -> RwLockWriteGuard<'_, Page> {
        self.page.write()
    }

    /// The resident page, or `None` if the frame is empty.
    #[inline]
    pub fn page_id(&self) -> Option<PageId> {
        let id = PageId::new(self.page_id.load(Ordering::Acquire));
        id.is_valid().then_some(id)
    }

    #[inline]
    pub fn set_page_id(&self, page_id: Option<PageId>) {
        let raw = page_id.unwrap_or(PageId::INVALID).0;
        self.page_id.store(raw, Ordering::Release);
    }

    /// Increment the pin count. Returns the new count.
    #[inline]
    pub fn pin(&self) -> u32 {
        self.pin_count.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Decrement the pin count. Returns the new count.
    ///
    /// # Panics
    /// Panics if the frame is not pinned.
    #[inline]
    pub fn unpin(&self) -> u32 {
        let old = self.pin_count.fetch_sub(1, Ordering::AcqRel);
        assert!(old > 0, "pin count underflow");
        old - 1
    }

    #[inline]
    pub fn pin_count(&self) -> u32 {
        self.pin_count.load(Ordering::Acquire)
    }

    #[inline]
    pub fn is_pinned(&self) -> bool {
        self.pin_count() > 0
    }

    #[inline]
    pub fn mark_dirty(&self) {
        self.is_dirty.store(true, Ordering::Release);
    }

    #[inline]
    pub fn clear_dirty(&self) {
        self.is_dirty.store(false, Ordering::Release);
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.is_dirty.load(Ordering::Acquire)
    }

    /// Return the frame to its empty state after eviction or deletion.
    pub fn reset(&self) {
        self.set_page_id(None);
        self.pin_count.store(0, Ordering::Release);
        self.clear_dirty();
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::new()
    }
}
