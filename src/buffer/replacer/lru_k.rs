//! LRU-K replacement policy.

use std::collections::{HashMap, VecDeque};

use super::Replacer;
use crate::common::FrameId;

struct History {
    /// Most recent `k` access stamps, oldest at the front.
    stamps: VecDeque<u64>,
    evictable: bool,
}

/// Evicts the frame with the largest backward K-distance.
///
/// Frames with fewer than K recorded accesses have infinite distance and are
/// evicted first, oldest first access winning ties.
pub struct LruKReplacer {
    k: usize,
    clock: u64,
    frames: HashMap<FrameId, History>,
    evictable_count: usize,
}

impl LruKReplacer {
    /// `k` is clamped to at least 1 (LRU-1 is plain LRU).
    pub fn new(k: usize) -> Self {
        Self {
            k: k.max(1),
            clock: 0,
            frames: HashMap::new(),
            evictable_count: 0,
        }
    }
}

impl Replacer for LruKReplacer {
    fn record_access(&mut self, frame_id: FrameId) {
        self.clock += 1;
        let history = self.frames.entry(frame_id).or_insert_with(|| History {
            stamps: VecDeque::new(),
            evictable: false,
        });
        history.stamps.push_back(self.clock);
        if history.stamps.len() > self.k {
            history.stamps.pop_front();
        }
    }

    fn set_evictable(&mut self, frame_id: FrameId, evictable: bool) {
        let Some(history) = self.frames.get_mut(&frame_id) else {
            return;
        };
        if history.evictable == evictable {
            return;
        }
        history.evictable = evictable;
        if evictable {
            self.evictable_count += 1;
        } else {
            self.evictable_count -= 1;
        }
    }

    fn evict(&mut self) -> Option<FrameId> {
        // Ordering key: (has full history, oldest relevant stamp).
        // `false` sorts first, so infinite-distance frames win.
        let victim = self
            .frames
            .iter()
            .filter(|(_, h)| h.evictable)
            .min_by_key(|(fid, h)| {
                let front = h.stamps.front().copied().unwrap_or(0);
                (h.stamps.len() >= self.k, front, **fid)
            })
            .map(|(&fid, _)| fid)?;

        self.frames.remove(&victim);
        self.evictable_count -= 1;
        Some(victim)
    }

    fn remove(&mut self, frame_id: FrameId) {
        if let Some(history) = self.frames.remove(&frame_id) {
            if history.evictable {
                self.evictable_count -= 1;
            }
        }
    }

    fn size(&self) -> usize {
        self.evictable_count
    }
}
