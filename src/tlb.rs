use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TlbEntry {
    pub valid: bool,
    pub pid: u32,
    pub vpn: u32,
    pub pfn: usize,
    pub last_use: u64,
}

impl TlbEntry {
    #[inline]
    fn matches(&self, pid: u32, vpn: u32) -> bool {
        self.valid && self.pid == pid && self.vpn == vpn
    }
}

/// Fully associative TLB with LRU slot replacement.
///
/// Capacities are small (tens of entries), so every operation is a linear scan.
pub struct Tlb {
    entries: Vec<TlbEntry>,
}

impl Tlb {
    pub fn new(capacity: usize) -> Self {
        Tlb { entries: vec![TlbEntry::default(); capacity] }
    }

    /// Look up a translation, refreshing its recency on a hit
    pub fn lookup(&mut self, pid: u32, vpn: u32, clock: u64) -> Option<usize> {
        let entry = self.entries.iter_mut().find(|e| e.matches(pid, vpn))?;
        entry.last_use = clock;
        Some(entry.pfn)
    }

    /// Install a translation.
    ///
    /// Slot choice: the first invalid slot, else the least recently used slot (first one wins on
    /// ties). A key that is already cached is refreshed in place instead, so valid keys stay
    /// unique even for callers that insert without a preceding miss.
    pub fn insert(&mut self, pid: u32, vpn: u32, pfn: usize, clock: u64) {
        let slot = self
            .entries
            .iter()
            .position(|e| e.matches(pid, vpn))
            .or_else(|| self.entries.iter().position(|e| !e.valid))
            .or_else(|| {
                self.entries
                    .iter()
                    .enumerate()
                    .min_by_key(|(_, e)| e.last_use)
                    .map(|(i, _)| i)
            });

        if let Some(slot) = slot {
            self.entries[slot] = TlbEntry { valid: true, pid, vpn, pfn, last_use: clock };
        }
    }

    /// Drop every valid entry for `(pid, vpn)`
    pub fn invalidate(&mut self, pid: u32, vpn: u32) {
        for entry in self.entries.iter_mut().filter(|e| e.matches(pid, vpn)) {
            entry.valid = false;
        }
    }

    pub fn entries(&self) -> &[TlbEntry] {
        &self.entries
    }

    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    pub fn valid_count(&self) -> usize {
        self.entries.iter().filter(|e| e.valid).count()
    }
}
