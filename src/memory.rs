use serde::Serialize;

/// Identifies a virtual page of one process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PageKey {
    pub pid: u32,
    pub vpn: u32,
}

impl PageKey {
    pub fn new(pid: u32, vpn: u32) -> Self {
        PageKey { pid, vpn }
    }
}

/// One physical frame. A frame without an owner is free.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Frame {
    pub number: usize,
    pub owner: Option<PageKey>,
    pub dirty: bool,
    pub referenced: bool,
    pub last_access: u64,
}

impl Frame {
    fn new(number: usize) -> Self {
        Frame { number, owner: None, dirty: false, referenced: false, last_access: 0 }
    }

    #[inline]
    pub fn is_free(&self) -> bool {
        self.owner.is_none()
    }

    /// Record a hit on a resident page
    pub fn touch(&mut self, clock: u64, is_write: bool) {
        self.referenced = true;
        self.last_access = clock;
        if is_write {
            self.dirty = true;
        }
    }

    /// Hand the frame to a newly faulted page
    pub fn assign(&mut self, owner: PageKey, clock: u64, is_write: bool) {
        self.owner = Some(owner);
        self.dirty = is_write;
        self.referenced = true;
        self.last_access = clock;
    }
}

/// Physical frames plus the pool of frames never handed out
pub struct FrameStore {
    frames: Vec<Frame>,
    free_frames: Vec<usize>,
}

impl FrameStore {
    /// Create `count` free frames. Frame 0 is allocated first.
    pub fn new(count: usize) -> Self {
        FrameStore {
            frames: (0..count).map(Frame::new).collect(),
            free_frames: (0..count).rev().collect(),
        }
    }

    /// Take a frame from the free pool
    pub fn allocate(&mut self) -> Option<usize> {
        self.free_frames.pop()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn free_count(&self) -> usize {
        self.free_frames.len()
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn frame(&self, pfn: usize) -> Option<&Frame> {
        self.frames.get(pfn)
    }

    pub(crate) fn frame_mut(&mut self, pfn: usize) -> &mut Frame {
        &mut self.frames[pfn]
    }

    pub(crate) fn frames_mut(&mut self) -> &mut [Frame] {
        &mut self.frames
    }

    pub fn occupied(&self) -> impl Iterator<Item = &Frame> + '_ {
        self.frames.iter().filter(|f| !f.is_free())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_store_initialization() {
        let store = FrameStore::new(8);
        assert_eq!(store.len(), 8);
        assert_eq!(store.free_count(), 8);
        assert!(store.frames().iter().all(Frame::is_free));
        assert_eq!(store.occupied().count(), 0);
        for (i, frame) in store.frames().iter().enumerate() {
            assert_eq!(frame.number, i);
        }
    }

    #[test]
    fn test_allocate_in_ascending_order() {
        let mut store = FrameStore::new(3);
        assert_eq!(store.allocate(), Some(0));
        assert_eq!(store.allocate(), Some(1));
        assert_eq!(store.allocate(), Some(2));
        assert_eq!(store.allocate(), None);
        assert_eq!(store.free_count(), 0);
    }

    #[test]
    fn test_allocate_zero_frames() {
        let mut store = FrameStore::new(0);
        assert!(store.is_empty());
        assert_eq!(store.allocate(), None);
    }

    #[test]
    fn test_assign_and_touch() {
        let mut store = FrameStore::new(2);
        let pfn = store.allocate().unwrap();

        store.frame_mut(pfn).assign(PageKey::new(3, 40), 7, false);
        let frame = store.frame(pfn).unwrap();
        assert_eq!(frame.owner, Some(PageKey::new(3, 40)));
        assert!(!frame.dirty);
        assert!(frame.referenced);
        assert_eq!(frame.last_access, 7);

        store.frame_mut(pfn).referenced = false;
        store.frame_mut(pfn).touch(9, true);
        let frame = store.frame(pfn).unwrap();
        assert!(frame.dirty);
        assert!(frame.referenced);
        assert_eq!(frame.last_access, 9);

        // A later read keeps the page dirty
        store.frame_mut(pfn).touch(10, false);
        assert!(store.frame(pfn).unwrap().dirty);
        assert_eq!(store.occupied().count(), 1);
    }

    #[test]
    fn test_reassign_resets_dirty() {
        let mut store = FrameStore::new(1);
        store.frame_mut(0).assign(PageKey::new(0, 1), 1, true);
        store.frame_mut(0).assign(PageKey::new(1, 2), 2, false);
        let frame = store.frame(0).unwrap();
        assert_eq!(frame.owner, Some(PageKey::new(1, 2)));
        assert!(!frame.dirty);
    }

    #[test]
    fn test_frame_out_of_range() {
        let store = FrameStore::new(2);
        assert!(store.frame(2).is_none());
    }
}
