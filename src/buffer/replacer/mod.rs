//! Eviction policy implementations (replacers).
//!
//! Every policy implements [`Replacer`]; the buffer pool holds one behind a
//! `Box<dyn Replacer>` chosen by [`ReplacementPolicy`] at construction.
//!
//! - [`FifoReplacer`] - oldest admitted frame first
//! - [`LruReplacer`] - least recently accessed frame first
//! - [`ClockReplacer`] - second-chance sweep over reference bits
//! - [`LruKReplacer`] - largest backward K-distance first

mod clock;
mod fifo;
mod lru;
mod lru_k;

pub use clock::ClockReplacer;
pub use fifo::FifoReplacer;
pub use lru::LruReplacer;
pub use lru_k::LruKReplacer;

use crate::common::config::DEFAULT_LRU_K;
use crate::common::FrameId;

/// A page replacement algorithm.
///
/// The buffer pool reports every access and every pin-state change; the
/// replacer only ever picks victims among frames marked evictable.
pub trait Replacer: Send {
    /// Record that `frame_id` was accessed (a pin or a fresh load).
    fn record_access(&mut self, frame_id: FrameId);

    /// Mark a frame as evictable (pin count dropped to zero) or not.
    fn set_evictable(&mut self, frame_id: FrameId, evictable: bool);

    /// Select and forget a victim frame, or `None` if everything is pinned.
    fn evict(&mut self) -> Option<FrameId>;

    /// Forget a frame entirely (its page was deleted from the pool).
    fn remove(&mut self, frame_id: FrameId);

    /// Number of evictable frames.
    fn size(&self) -> usize;
}

/// Which [`Replacer`] a buffer pool uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplacementPolicy {
    Fifo,
    Lru,
    Clock,
    /// LRU-K with the given history depth.
    LruK(usize),
}

impl ReplacementPolicy {
    /// LRU-K with the default history depth.
    pub fn lru_k() -> Self {
        ReplacementPolicy::LruK(DEFAULT_LRU_K)
    }

    /// Build a replacer sized for `pool_size` frames.
    pub fn build(self, pool_size: usize) -> Box<dyn Replacer> {
        match self {
            ReplacementPolicy::Fifo => Box::new(FifoReplacer::new()),
            ReplacementPolicy::Lru => Box::new(LruReplacer::new()),
            ReplacementPolicy::Clock => Box::new(ClockReplacer::new(pool_size)),
            ReplacementPolicy::LruK(k) => Box::new(LruKReplacer::new(k)),
        }
    }
}
