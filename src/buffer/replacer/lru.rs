//! LRU (Least Recently Used) replacement policy.

use std::collections::{BTreeMap, HashMap, HashSet};

use super::Replacer;
use crate::common::FrameId;

/// Evicts the evictable frame whose last access is oldest.
///
/// Accesses are stamped with a logical clock; `order` maps stamp to frame so
/// the oldest frame is the first entry.
#[derive(Default)]
pub struct LruReplacer {
    clock: u64,
    last_access: HashMap<FrameId, u64>,
    order: BTreeMap<u64, FrameId>,
    evictable: HashSet<FrameId>,
}

impl LruReplacer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Replacer for LruReplacer {
    fn record_access(&mut self, frame_id: FrameId) {
        self.clock += 1;
        if let Some(old) = self.last_access.insert(frame_id, self.clock) {
            self.order.remove(&old);
        }
        self.order.insert(self.clock, frame_id);
    }

    fn set_evictable(&mut self, frame_id: FrameId, evictable: bool) {
        if evictable {
            self.evictable.insert(frame_id);
        } else {
            self.evictable.remove(&frame_id);
        }
    }

    fn evict(&mut self) -> Option<FrameId> {
        let (&stamp, &frame_id) = self
            .order
            .iter()
            .find(|(_, fid)| self.evictable.contains(fid))?;
        self.order.remove(&stamp);
        self.last_access.remove(&frame_id);
        self.evictable.remove(&frame_id);
        Some(frame_id)
    }

    fn remove(&mut self, frame_id: FrameId) {
        if let Some(stamp) = self.last_access.remove(&frame_id) {
            self.order.remove(&stamp);
        }
        self.evictable.remove(&frame_id);
    }

    fn size(&self) -> usize {
        self.evictable.len()
    }
}
