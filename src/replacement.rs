//! Frame replacement policies
//!
//! Consulted only when the free pool is empty. LRU and CLOCK read their state straight from the
//! frame store (`last_access`, `referenced`); FIFO keeps its own allocation-order queue.

use std::collections::VecDeque;

use log::trace;

use crate::config::Algorithm;
use crate::memory::FrameStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplacementPolicy {
    Fifo { queue: VecDeque<usize> },
    Lru,
    Clock { hand: usize },
}

impl ReplacementPolicy {
    pub fn new(algorithm: Algorithm) -> Self {
        match algorithm {
            Algorithm::Fifo => ReplacementPolicy::Fifo { queue: VecDeque::new() },
            Algorithm::Lru => ReplacementPolicy::Lru,
            Algorithm::Clock => ReplacementPolicy::Clock { hand: 0 },
        }
    }

    pub fn algorithm(&self) -> Algorithm {
        match self {
            ReplacementPolicy::Fifo { .. } => Algorithm::Fifo,
            ReplacementPolicy::Lru => Algorithm::Lru,
            ReplacementPolicy::Clock { .. } => Algorithm::Clock,
        }
    }

    /// Called whenever a frame is (re)assigned to a page
    pub fn on_allocate(&mut self, pfn: usize) {
        if let ReplacementPolicy::Fifo { queue } = self {
            queue.push_back(pfn);
        }
    }

    /// Pick the frame to evict. `None` only when no frame is occupied.
    pub fn select_victim(&mut self, frames: &mut FrameStore) -> Option<usize> {
        let victim = match self {
            ReplacementPolicy::Fifo { queue } => queue.pop_front(),
            ReplacementPolicy::Lru => lru_victim(frames),
            ReplacementPolicy::Clock { hand } => clock_victim(hand, frames),
        };
        trace!("{} victim: {:?}", self.algorithm(), victim);
        victim
    }

    /// Current CLOCK hand position, if this is a CLOCK policy
    pub fn clock_hand(&self) -> Option<usize> {
        match self {
            ReplacementPolicy::Clock { hand } => Some(*hand),
            _ => None,
        }
    }

    /// Frames in FIFO eviction order, if this is a FIFO policy
    pub fn fifo_queue(&self) -> Option<&VecDeque<usize>> {
        match self {
            ReplacementPolicy::Fifo { queue } => Some(queue),
            _ => None,
        }
    }
}

/// Oldest `last_access`; lowest frame number on ties
fn lru_victim(frames: &FrameStore) -> Option<usize> {
    frames
        .occupied()
        .min_by_key(|f| f.last_access)
        .map(|f| f.number)
}

/// Second chance sweep. The first revolution clears every referenced bit it passes, so the
/// second one stops at the first occupied frame at the latest.
fn clock_victim(hand: &mut usize, frames: &mut FrameStore) -> Option<usize> {
    let len = frames.len();
    if len == 0 {
        return None;
    }
    *hand %= len;

    for _ in 0..2 * len {
        let current = *hand;
        *hand = (current + 1) % len;

        let frame = &mut frames.frames_mut()[current];
        if frame.is_free() {
            continue;
        }
        if !frame.referenced {
            return Some(current);
        }
        frame.referenced = false;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::PageKey;

    /// Fill every frame, frame `i` holding VPN `i` and last touched at `times[i]`
    fn full_store(times: &[u64]) -> FrameStore {
        let mut store = FrameStore::new(times.len());
        for (vpn, &t) in times.iter().enumerate() {
            let pfn = store.allocate().unwrap();
            store.frame_mut(pfn).assign(PageKey::new(0, vpn as u32), t, false);
        }
        store
    }

    #[test]
    fn test_new_matches_algorithm() {
        for algorithm in [Algorithm::Fifo, Algorithm::Lru, Algorithm::Clock] {
            assert_eq!(ReplacementPolicy::new(algorithm).algorithm(), algorithm);
        }
        assert_eq!(ReplacementPolicy::new(Algorithm::Clock).clock_hand(), Some(0));
        assert_eq!(ReplacementPolicy::new(Algorithm::Lru).clock_hand(), None);
    }

    #[test]
    fn test_fifo_evicts_in_allocation_order() {
        let mut store = full_store(&[1, 2, 3]);
        let mut policy = ReplacementPolicy::new(Algorithm::Fifo);
        policy.on_allocate(2);
        policy.on_allocate(0);
        policy.on_allocate(1);

        assert_eq!(policy.select_victim(&mut store), Some(2));
        policy.on_allocate(2);
        assert_eq!(policy.select_victim(&mut store), Some(0));
        assert_eq!(policy.select_victim(&mut store), Some(1));
        assert_eq!(policy.select_victim(&mut store), Some(2));
        assert_eq!(policy.select_victim(&mut store), None);
    }

    #[test]
    fn test_fifo_ignores_recency() {
        let mut store = full_store(&[100, 1]);
        let mut policy = ReplacementPolicy::new(Algorithm::Fifo);
        policy.on_allocate(0);
        policy.on_allocate(1);
        assert_eq!(policy.select_victim(&mut store), Some(0));
    }

    #[test]
    fn test_lru_picks_oldest() {
        let mut store = full_store(&[5, 2, 9, 4]);
        let mut policy = ReplacementPolicy::new(Algorithm::Lru);
        assert_eq!(policy.select_victim(&mut store), Some(1));
    }

    #[test]
    fn test_lru_tie_picks_lowest_frame() {
        let mut store = full_store(&[7, 3, 3, 8]);
        let mut policy = ReplacementPolicy::new(Algorithm::Lru);
        assert_eq!(policy.select_victim(&mut store), Some(1));
    }

    #[test]
    fn test_lru_skips_free_frames() {
        let mut store = FrameStore::new(3);
        store.allocate();
        let pfn = store.allocate().unwrap();
        store.frame_mut(pfn).assign(PageKey::new(0, 0), 10, false);

        let mut policy = ReplacementPolicy::new(Algorithm::Lru);
        assert_eq!(policy.select_victim(&mut store), Some(1));
    }

    #[test]
    fn test_lru_nothing_occupied() {
        let mut store = FrameStore::new(3);
        let mut policy = ReplacementPolicy::new(Algorithm::Lru);
        assert_eq!(policy.select_victim(&mut store), None);
    }

    #[test]
    fn test_clock_picks_first_unreferenced() {
        let mut store = full_store(&[1, 2, 3]);
        store.frame_mut(1).referenced = false;

        let mut policy = ReplacementPolicy::new(Algorithm::Clock);
        assert_eq!(policy.select_victim(&mut store), Some(1));
        assert_eq!(policy.clock_hand(), Some(2));

        // Frame 0 lost its reference bit on the way
        assert!(!store.frame(0).unwrap().referenced);
        assert!(store.frame(2).unwrap().referenced);
    }

    #[test]
    fn test_clock_all_referenced_takes_second_pass() {
        let mut store = full_store(&[1, 2, 3]);
        let mut policy = ReplacementPolicy::Clock { hand: 1 };

        assert_eq!(policy.select_victim(&mut store), Some(1));
        assert_eq!(policy.clock_hand(), Some(2));
        assert!(store.frames().iter().all(|f| !f.referenced));
    }

    #[test]
    fn test_clock_skips_free_frames() {
        let mut store = FrameStore::new(4);
        for vpn in 0..2 {
            let pfn = store.allocate().unwrap();
            store.frame_mut(pfn).assign(PageKey::new(0, vpn), 1, false);
        }
        store.frame_mut(0).referenced = false;
        store.frame_mut(1).referenced = false;

        let mut policy = ReplacementPolicy::Clock { hand: 2 };
        assert_eq!(policy.select_victim(&mut store), Some(0));
        assert_eq!(policy.clock_hand(), Some(1));
    }

    #[test]
    fn test_clock_nothing_occupied() {
        let mut store = FrameStore::new(2);
        let mut policy = ReplacementPolicy::new(Algorithm::Clock);
        assert_eq!(policy.select_victim(&mut store), None);

        let mut empty = FrameStore::new(0);
        assert_eq!(policy.select_victim(&mut empty), None);
    }

    #[test]
    fn test_clock_hand_wraps() {
        let mut store = full_store(&[1, 2]);
        store.frame_mut(1).referenced = false;

        let mut policy = ReplacementPolicy::Clock { hand: 1 };
        assert_eq!(policy.select_victim(&mut store), Some(1));
        assert_eq!(policy.clock_hand(), Some(0));
    }
}
