//! Buffer Pool Manager - the page cache.
//!
//! The [`BufferPoolManager`] provides:
//! - Page caching between the paged file and memory
//! - Pin-based reference counting through RAII guards
//! - Dirty page write-back on eviction and on demand
//! - A pluggable eviction policy chosen at construction

use std::collections::HashMap;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace};

use crate::buffer::replacer::{ReplacementPolicy, Replacer};
use crate::buffer::{BufferPoolStats, Frame, PageReadGuard, PageWriteGuard};
use crate::common::{Error, FrameId, PageId, Result};
use crate::storage::DiskManager;

type PageTable = HashMap<PageId, FrameId>;

/// Caches pages of one paged file in a fixed pool of frames.
///
/// # Architecture
/// ```text
/// ┌─────────────────────────────────────────────────────────────┐
/// │                    BufferPoolManager                        │
/// │  ┌──────────────┐  ┌───────────────────────────────────┐   │
/// │  │ page_table   │  │        frames: Vec<Frame>         │   │
/// │  │PageId → Fid  │─▶│  [Frame0] [Frame1] [Frame2] ...   │   │
/// │  └──────────────┘  └───────────────────────────────────┘   │
/// │  ┌──────────────┐  ┌──────────────────┐  ┌────────────┐    │
/// │  │  free_list   │  │     replacer     │  │disk_manager│    │
/// │  │ Vec<FrameId> │  │ Box<dyn Replacer>│  │   Mutex    │    │
/// │  └──────────────┘  └──────────────────┘  └────────────┘    │
/// └─────────────────────────────────────────────────────────────┘
/// ```
///
/// # Thread Safety
/// - `page_table`: `RwLock` — many readers, few writers
/// - `free_list`, `replacer`, `disk_manager`: `Mutex`
/// - `frames`: fixed size, each `Frame` has its own locks
/// - `stats`: atomic counters
///
/// Lock order is `page_table`, then `replacer`, then a frame's page lock.
/// Misses and evictions hold the `page_table` write lock until the new
/// mapping is in place, so a hit never pins a frame that is being reused.
pub struct BufferPoolManager {
    frames: Vec<Frame>,
    page_table: RwLock<PageTable>,
    /// LIFO stack of empty frames.
    free_list: Mutex<Vec<FrameId>>,
    replacer: Mutex<Box<dyn Replacer>>,
    policy: ReplacementPolicy,
    disk_manager: Mutex<DiskManager>,
    stats: BufferPoolStats,
}

impl BufferPoolManager {
    /// Create a pool of `pool_size` frames over `disk_manager`.
    ///
    /// # Errors
    /// `Error::InvalidArgument` if `pool_size` is 0.
    pub fn new(
        pool_size: usize,
        disk_manager: DiskManager,
        policy: ReplacementPolicy,
    ) -> Result<Self> {
        if pool_size == 0 {
            return Err(Error::invalid("pool_size must be > 0"));
        }

        let frames = (0..pool_size).map(|_| Frame::new()).collect();
        // Reversed so that pop() hands out frame 0 first.
        let free_list = (0..pool_size).rev().map(FrameId::new).collect();

        debug!(pool_size, ?policy, "buffer pool initialized");
        Ok(Self {
            frames,
            page_table: RwLock::new(HashMap::new()),
            free_list: Mutex::new(free_list),
            replacer: Mutex::new(policy.build(pool_size)),
            policy,
            disk_manager: Mutex::new(disk_manager),
            stats: BufferPoolStats::new(),
        })
    }

    // ========================================================================
    // Pinning
    // ========================================================================

    /// Pin a page for shared access.
    ///
    /// # Errors
    /// - `Error::PageNotFound` if the page doesn't exist in the file
    /// - `Error::NoFreeFrames` if every frame is pinned
    pub fn fetch_page_read(&self, page_id: PageId) -> Result<PageReadGuard<'_>> {
        let frame_id = self.fetch_page_internal(page_id)?;
        let lock = self.frames[frame_id.0].page();
        Ok(PageReadGuard::new(self, frame_id, page_id, lock))
    }

    /// Pin a page for exclusive access.
    ///
    /// # Errors
    /// Same as [`BufferPoolManager::fetch_page_read`].
    pub fn fetch_page_write(&self, page_id: PageId) -> Result<PageWriteGuard<'_>> {
        let frame_id = self.fetch_page_internal(page_id)?;
        let lock = self.frames[frame_id.0].page_mut();
        Ok(PageWriteGuard::new(self, frame_id, page_id, lock))
    }

    /// Append a page to the file and pin it for writing.
    pub fn new_page(&self) -> Result<PageWriteGuard<'_>> {
        let mut pt = self.page_table.write();
        let frame_id = self.get_free_frame(&mut pt)?;

        let page_id = match self.disk_manager.lock().allocate_page() {
            Ok(pid) => pid,
            Err(e) => {
                self.free_list.lock().push(frame_id);
                return Err(e);
            }
        };

        let frame = &self.frames[frame_id.0];
        frame.page_mut().reset();
        self.install(&mut pt, frame_id, page_id);
        drop(pt);

        let mut guard = PageWriteGuard::new(self, frame_id, page_id, frame.page_mut());
        guard.mark_dirty();
        Ok(guard)
    }

    /// Drop an unpinned page from the pool without writing it back.
    ///
    /// The block stays allocated in the file.
    ///
    /// # Errors
    /// `Error::PagePinned` if the page is still pinned.
    pub fn delete_page(&self, page_id: PageId) -> Result<()> {
        let mut pt = self.page_table.write();

        let Some(&frame_id) = pt.get(&page_id) else {
            return Ok(());
        };

        let frame = &self.frames[frame_id.0];
        if frame.is_pinned() {
            return Err(Error::PagePinned(page_id.0));
        }

        pt.remove(&page_id);
        drop(pt);

        frame.reset();
        self.replacer.lock().remove(frame_id);
        self.free_list.lock().push(frame_id);
        Ok(())
    }

    // ========================================================================
    // Write-back
    // ========================================================================

    /// Write a single resident page back if it is dirty.
    pub fn flush_page(&self, page_id: PageId) -> Result<()> {
        let frame_id = match self.page_table.read().get(&page_id) {
            Some(&fid) => fid,
            None => return Ok(()),
        };
        self.flush_frame(frame_id, page_id)
    }

    /// Force-flush every dirty page that nobody currently has pinned.
    ///
    /// Returns how many pages were written.
    pub fn flush_all_pages(&self) -> Result<usize> {
        let pages: Vec<(PageId, FrameId)> = self
            .page_table
            .read()
            .iter()
            .map(|(&pid, &fid)| (pid, fid))
            .collect();

        let mut written = 0;
        for (page_id, frame_id) in pages {
            let frame = &self.frames[frame_id.0];
            if frame.is_pinned() || !frame.is_dirty() {
                continue;
            }
            self.flush_frame(frame_id, page_id)?;
            written += 1;
        }

        debug!(written, "flushed buffer pool");
        Ok(written)
    }

    /// Grow the underlying file to at least `min_pages` pages.
    pub fn ensure_capacity(&self, min_pages: u32) -> Result<()> {
        self.disk_manager.lock().ensure_capacity(min_pages)
    }

    /// Flush everything and hand back the disk manager.
    pub fn into_disk_manager(self) -> Result<DiskManager> {
        self.flush_all_pages()?;
        Ok(self.disk_manager.into_inner())
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    pub fn stats(&self) -> &BufferPoolStats {
        &self.stats
    }

    pub fn policy(&self) -> ReplacementPolicy {
        self.policy
    }

    pub fn pool_size(&self) -> usize {
        self.frames.len()
    }

    pub fn free_frame_count(&self) -> usize {
        self.free_list.lock().len()
    }

    /// Number of resident pages.
    pub fn page_count(&self) -> usize {
        self.page_table.read().len()
    }

    pub fn contains_page(&self, page_id: PageId) -> bool {
        self.page_table.read().contains_key(&page_id)
    }

    /// Pin count of a resident page, `None` if the page is not resident.
    pub fn pin_count(&self, page_id: PageId) -> Option<u32> {
        let pt = self.page_table.read();
        pt.get(&page_id).map(|fid| self.frames[fid.0].pin_count())
    }

    /// Page held by each frame, in frame order.
    pub fn frame_contents(&self) -> Vec<Option<PageId>> {
        self.frames.iter().map(Frame::page_id).collect()
    }

    /// Dirty flag of each frame, in frame order.
    pub fn dirty_flags(&self) -> Vec<bool> {
        self.frames.iter().map(Frame::is_dirty).collect()
    }

    /// Pin count of each frame, in frame order.
    pub fn fix_counts(&self) -> Vec<u32> {
        self.frames.iter().map(Frame::pin_count).collect()
    }

    // ========================================================================
    // Internal
    // ========================================================================

    /// Called by the guards on drop.
    pub(crate) fn unpin_page_internal(&self, frame_id: FrameId, is_dirty: bool) {
        let frame = &self.frames[frame_id.0];
        if is_dirty {
            frame.mark_dirty();
        }
        // A concurrent hit pins and then takes this lock to mark the frame
        // non-evictable, so the two updates can't cross.
        let mut replacer = self.replacer.lock();
        if frame.unpin() == 0 {
            replacer.set_evictable(frame_id, true);
        }
    }

    fn fetch_page_internal(&self, page_id: PageId) -> Result<FrameId> {
        {
            let pt = self.page_table.read();
            if let Some(&frame_id) = pt.get(&page_id) {
                self.pin_resident(frame_id);
                return Ok(frame_id);
            }
        }

        let mut pt = self.page_table.write();
        // Another thread may have loaded the page since the read lock dropped.
        if let Some(&frame_id) = pt.get(&page_id) {
            self.pin_resident(frame_id);
            return Ok(frame_id);
        }

        self.stats.record_miss();
        let frame_id = self.get_free_frame(&mut pt)?;

        let loaded = self.disk_manager.lock().read_page(page_id);
        let page_data = match loaded {
            Ok(page) => page,
            Err(e) => {
                self.free_list.lock().push(frame_id);
                return Err(e);
            }
        };
        self.stats.record_read();

        let frame = &self.frames[frame_id.0];
        frame
            .page_mut()
            .as_mut_slice()
            .copy_from_slice(page_data.as_slice());
        self.install(&mut pt, frame_id, page_id);

        trace!(%page_id, %frame_id, "loaded page");
        Ok(frame_id)
    }

    fn pin_resident(&self, frame_id: FrameId) {
        self.frames[frame_id.0].pin();
        self.touch(frame_id);
        self.stats.record_hit();
    }

    /// Bind `page_id` to an empty frame and pin it once.
    fn install(&self, pt: &mut PageTable, frame_id: FrameId, page_id: PageId) {
        let frame = &self.frames[frame_id.0];
        frame.set_page_id(Some(page_id));
        frame.pin();
        pt.insert(page_id, frame_id);
        self.touch(frame_id);
    }

    fn touch(&self, frame_id: FrameId) {
        let mut replacer = self.replacer.lock();
        replacer.record_access(frame_id);
        replacer.set_evictable(frame_id, false);
    }

    fn get_free_frame(&self, pt: &mut PageTable) -> Result<FrameId> {
        if let Some(frame_id) = self.free_list.lock().pop() {
            return Ok(frame_id);
        }
        self.evict_page(pt)
    }

    /// Caller holds the `page_table` write lock, so no hit can pin the victim.
    fn evict_page(&self, pt: &mut PageTable) -> Result<FrameId> {
        let frame_id = self.replacer.lock().evict().ok_or(Error::NoFreeFrames)?;
        self.stats.record_eviction();

        let frame = &self.frames[frame_id.0];
        debug_assert!(!frame.is_pinned(), "evicting a pinned frame");
        if let Some(pid) = frame.page_id() {
            if let Err(e) = self.flush_frame(frame_id, pid) {
                // Put the victim back so the page stays reachable.
                let mut replacer = self.replacer.lock();
                replacer.record_access(frame_id);
                replacer.set_evictable(frame_id, true);
                return Err(e);
            }
            pt.remove(&pid);
            trace!(page_id = %pid, %frame_id, "evicted page");
        }

        frame.reset();
        Ok(frame_id)
    }

    fn flush_frame(&self, frame_id: FrameId, page_id: PageId) -> Result<()> {
        let frame = &self.frames[frame_id.0];
        if !frame.is_dirty() {
            return Ok(());
        }

        {
            let page = frame.page();
            // The frame was reused for another page after the lookup.
            if frame.page_id() != Some(page_id) {
                return Ok(());
            }
            self.disk_manager.lock().write_page(page_id, &page)?;
            frame.clear_dirty();
        }
        self.stats.record_write();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn create_test_bpm(
        pool_size: usize,
        policy: ReplacementPolicy,
    ) -> (BufferPoolManager, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let dm = DiskManager::create(dir.path().join("test.db")).unwrap();
        (BufferPoolManager::new(pool_size, dm, policy).unwrap(), dir)
    }

    #[test]
    fn test_zero_pool_rejected() {
        let dir = tempdir().unwrap();
        let dm = DiskManager::create(dir.path().join("test.db")).unwrap();
        assert!(matches!(
            BufferPoolManager::new(0, dm, ReplacementPolicy::Fifo),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_new_page_ids_are_sequential() {
        let (bpm, _dir) = create_test_bpm(4, ReplacementPolicy::Fifo);
        assert_eq!(bpm.new_page().unwrap().page_id(), PageId::new(0));
        assert_eq!(bpm.new_page().unwrap().page_id(), PageId::new(1));
        assert_eq!(bpm.frame_contents()[0], Some(PageId::new(0)));
    }

    #[test]
    fn test_read_guard_does_not_dirty() {
        let (bpm, _dir) = create_test_bpm(4, ReplacementPolicy::Lru);
        let pid = bpm.new_page().unwrap().page_id();
        bpm.flush_page(pid).unwrap();

        {
            let guard = bpm.fetch_page_read(pid).unwrap();
            assert_eq!(guard.read_i32(0), 0);
        }
        assert_eq!(bpm.dirty_flags(), vec![false, false, false, false]);

        {
            let guard = bpm.fetch_page_write(pid).unwrap();
            assert!(!guard.is_dirty());
        }
        assert!(!bpm.dirty_flags()[0]);

        {
            let mut guard = bpm.fetch_page_write(pid).unwrap();
            guard.write_i32(0, 5);
        }
        assert!(bpm.dirty_flags()[0]);
    }

    #[test]
    fn test_fix_counts_follow_guards() {
        let (bpm, _dir) = create_test_bpm(3, ReplacementPolicy::Clock);
        let pid = bpm.new_page().unwrap().page_id();

        let g1 = bpm.fetch_page_read(pid).unwrap();
        let g2 = bpm.fetch_page_read(pid).unwrap();
        assert_eq!(bpm.pin_count(pid), Some(2));
        assert_eq!(bpm.fix_counts(), vec![2, 0, 0]);

        drop(g1);
        drop(g2);
        assert_eq!(bpm.pin_count(pid), Some(0));
    }

    #[test]
    fn test_dirty_page_flushed_on_eviction() {
        let (bpm, _dir) = create_test_bpm(1, ReplacementPolicy::Fifo);

        let pid0 = {
            let mut guard = bpm.new_page().unwrap();
            guard.write_i32(0, 0x42);
            guard.page_id()
        };
        let _ = bpm.new_page().unwrap().page_id();

        assert!(!bpm.contains_page(pid0));
        let guard = bpm.fetch_page_read(pid0).unwrap();
        assert_eq!(guard.read_i32(0), 0x42);

        let snapshot = bpm.stats().snapshot();
        assert_eq!(snapshot.evictions, 2);
        assert!(snapshot.pages_written >= 1);
    }

    #[test]
    fn test_no_free_frames_when_all_pinned() {
        let (bpm, _dir) = create_test_bpm(2, ReplacementPolicy::LruK(2));
        let _g1 = bpm.new_page().unwrap();
        let _g2 = bpm.new_page().unwrap();
        assert!(matches!(bpm.new_page(), Err(Error::NoFreeFrames)));
    }

    #[test]
    fn test_delete_page() {
        let (bpm, _dir) = create_test_bpm(4, ReplacementPolicy::Fifo);
        let guard = bpm.new_page().unwrap();
        let pid = guard.page_id();

        assert!(matches!(bpm.delete_page(pid), Err(Error::PagePinned(0))));
        drop(guard);

        bpm.delete_page(pid).unwrap();
        assert_eq!(bpm.page_count(), 0);
        assert_eq!(bpm.free_frame_count(), 4);
    }

    #[test]
    fn test_missing_page_returns_frame() {
        let (bpm, _dir) = create_test_bpm(2, ReplacementPolicy::Fifo);
        assert!(matches!(
            bpm.fetch_page_read(PageId::new(9)),
            Err(Error::PageNotFound(9))
        ));
        assert_eq!(bpm.free_frame_count(), 2);
    }

    #[test]
    fn test_ensure_capacity_makes_page_fetchable() {
        let (bpm, _dir) = create_test_bpm(2, ReplacementPolicy::Fifo);
        bpm.ensure_capacity(3).unwrap();
        let guard = bpm.fetch_page_read(PageId::new(2)).unwrap();
        assert_eq!(guard.read_i32(0), 0);
    }

    #[test]
    fn test_flush_all_skips_pinned() {
        let (bpm, _dir) = create_test_bpm(4, ReplacementPolicy::Fifo);
        let held = bpm.new_page().unwrap();
        for _ in 0..2 {
            bpm.new_page().unwrap();
        }

        assert_eq!(bpm.flush_all_pages().unwrap(), 2);
        drop(held);
        assert_eq!(bpm.flush_all_pages().unwrap(), 1);
        assert_eq!(bpm.flush_all_pages().unwrap(), 0);
    }
}
