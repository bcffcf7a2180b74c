//! CLOCK (second chance) replacement policy.

use super::Replacer;
use crate::common::FrameId;

#[derive(Clone, Copy, Default)]
struct Slot {
    tracked: bool,
    referenced: bool,
    evictable: bool,
}

/// Sweeps a hand over all frames; a set reference bit buys one more lap.
///
/// Sized once for the pool. Frame ids at or past the pool size are ignored.
pub struct ClockReplacer {
    slots: Vec<Slot>,
    hand: usize,
    evictable_count: usize,
}

impl ClockReplacer {
    pub fn new(num_frames: usize) -> Self {
        Self {
            slots: vec![Slot::default(); num_frames],
            hand: 0,
            evictable_count: 0,
        }
    }

    fn slot_mut(&mut self, frame_id: FrameId) -> Option<&mut Slot> {
        self.slots.get_mut(frame_id.0)
    }
}

impl Replacer for ClockReplacer {
    fn record_access(&mut self, frame_id: FrameId) {
        if let Some(slot) = self.slot_mut(frame_id) {
            slot.tracked = true;
            slot.referenced = true;
        }
    }

    fn set_evictable(&mut self, frame_id: FrameId, evictable: bool) {
        let Some(slot) = self.slot_mut(frame_id) else {
            return;
        };
        if !slot.tracked || slot.evictable == evictable {
            return;
        }
        slot.evictable = evictable;
        if evictable {
            self.evictable_count += 1;
        } else {
            self.evictable_count -= 1;
        }
    }

    fn evict(&mut self) -> Option<FrameId> {
        if self.evictable_count == 0 {
            return None;
        }

        // Two laps are enough: the first clears every reference bit.
        for _ in 0..2 * self.slots.len() {
            let idx = self.hand;
            self.hand = (self.hand + 1) % self.slots.len();

            let slot = &mut self.slots[idx];
            if !slot.tracked || !slot.evictable {
                continue;
            }
            if slot.referenced {
                slot.referenced = false;
                continue;
            }

            *slot = Slot::default();
            self.evictable_count -= 1;
            return Some(FrameId::new(idx));
        }
        None
    }

    fn remove(&mut self, frame_id: FrameId) {
        if let Some(slot) = self.slot_mut(frame_id) {
            let was_evictable = slot.tracked && slot.evictable;
            *slot = Slot::default();
            if was_evictable {
                self.evictable_count -= 1;
            }
        }
    }

    fn size(&self) -> usize {
        self.evictable_count
    }
}
