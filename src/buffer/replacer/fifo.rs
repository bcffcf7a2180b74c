//! FIFO (First-In-First-Out) replacement policy.

use std::collections::{HashSet, VecDeque};

use super::Replacer;
use crate::common::FrameId;

/// Evicts frames in the order their pages were admitted.
///
/// Re-accessing a resident frame does not move it.
#[derive(Default)]
pub struct FifoReplacer {
    /// Admission order (front = oldest).
    queue: VecDeque<FrameId>,
    in_queue: HashSet<FrameId>,
    evictable: HashSet<FrameId>,
}

impl FifoReplacer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Replacer for FifoReplacer {
    fn record_access(&mut self, frame_id: FrameId) {
        if self.in_queue.insert(frame_id) {
            self.queue.push_back(frame_id);
        }
    }

    fn set_evictable(&mut self, frame_id: FrameId, evictable: bool) {
        if evictable {
            self.evictable.insert(frame_id);
        } else {
            self.evictable.remove(&frame_id);
        }
    }

    fn evict(&mut self) -> Option<FrameId> {
        let pos = self
            .queue
            .iter()
            .position(|fid| self.in_queue.contains(fid) && self.evictable.contains(fid))?;
        let frame_id = self.queue.remove(pos)?;
        self.in_queue.remove(&frame_id);
        self.evictable.remove(&frame_id);
        Some(frame_id)
    }

    fn remove(&mut self, frame_id: FrameId) {
        self.in_queue.remove(&frame_id);
        self.evictable.remove(&frame_id);
        self.queue.retain(|&fid| fid != frame_id);
    }

    fn size(&self) -> usize {
        self.evictable.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order() {
        let mut replacer = FifoReplacer::new();
        for i in 0..3 {
            replacer.record_access(FrameId::new(i));
            replacer.set_evictable(FrameId::new(i), true);
        }

        assert_eq!(replacer.size(), 3);
        assert_eq!(replacer.evict(), Some(FrameId::new(0)));
        assert_eq!(replacer.evict(), Some(FrameId::new(1)));
        assert_eq!(replacer.evict(), Some(FrameId::new(2)));
        assert_eq!(replacer.evict(), None);
    }

    #[test]
    fn test_fifo_pinned_frame_keeps_its_place() {
        let mut replacer = FifoReplacer::new();
        replacer.record_access(FrameId::new(0));
        replacer.record_access(FrameId::new(1));
        replacer.set_evictable(FrameId::new(1), true);

        // Frame 0 is pinned: skipped, but not dropped from the queue.
        assert_eq!(replacer.evict(), Some(FrameId::new(1)));

        replacer.set_evictable(FrameId::new(0), true);
        assert_eq!(replacer.evict(), Some(FrameId::new(0)));
    }

    #[test]
    fn test_fifo_reaccess_no_reorder() {
        let mut replacer = FifoReplacer::new();
        replacer.record_access(FrameId::new(0));
        replacer.record_access(FrameId::new(1));
        replacer.record_access(FrameId::new(0));
        replacer.set_evictable(FrameId::new(0), true);
        replacer.set_evictable(FrameId::new(1), true);

        assert_eq!(replacer.evict(), Some(FrameId::new(0)));
    }

    #[test]
    fn test_fifo_remove() {
        let mut replacer = FifoReplacer::new();
        replacer.record_access(FrameId::new(0));
        replacer.record_access(FrameId::new(1));
        replacer.set_evictable(FrameId::new(0), true);
        replacer.set_evictable(FrameId::new(1), true);

        replacer.remove(FrameId::new(0));
        assert_eq!(replacer.size(), 1);
        assert_eq!(replacer.evict(), Some(FrameId::new(1)));
    }
}
