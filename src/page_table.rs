use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::memory::PageKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageTableEntry {
    pub valid: bool,
    pub pfn: usize,
    pub dirty: bool,
    pub accessed: bool,
    /// Evicted while dirty; the next fault on this page reads it back from swap
    pub swapped: bool,
}

/// Sparse single-level page table of one process
pub type ProcessPageTable = BTreeMap<u32, PageTableEntry>;

/// Page tables of every process seen so far.
///
/// Entries are created on first mapping and afterwards only invalidated, never removed.
#[derive(Default)]
pub struct PageTableSet {
    tables: HashMap<u32, ProcessPageTable>,
}

impl PageTableSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` when the page was never mapped; an invalid entry when it was mapped and evicted.
    pub fn lookup(&self, pid: u32, vpn: u32) -> Option<&PageTableEntry> {
        self.tables.get(&pid)?.get(&vpn)
    }

    pub fn map(&mut self, pid: u32, vpn: u32, pfn: usize) {
        self.tables.entry(pid).or_default().insert(
            vpn,
            PageTableEntry { valid: true, pfn, dirty: false, accessed: true, swapped: false },
        );
    }

    pub fn invalidate(&mut self, pid: u32, vpn: u32) {
        if let Some(pte) = self.entry_mut(pid, vpn) {
            pte.valid = false;
        }
    }

    /// Invalidate a page whose contents were written out to swap
    pub fn swap_out(&mut self, pid: u32, vpn: u32) {
        if let Some(pte) = self.entry_mut(pid, vpn) {
            pte.valid = false;
            pte.swapped = true;
        }
    }

    /// Set the dirty bit of a resident page
    pub fn mark_dirty(&mut self, pid: u32, vpn: u32) {
        if let Some(pte) = self.entry_mut(pid, vpn).filter(|pte| pte.valid) {
            pte.dirty = true;
        }
    }

    fn entry_mut(&mut self, pid: u32, vpn: u32) -> Option<&mut PageTableEntry> {
        self.tables.get_mut(&pid)?.get_mut(&vpn)
    }

    pub fn process(&self, pid: u32) -> Option<&ProcessPageTable> {
        self.tables.get(&pid)
    }

    /// Process IDs with a page table, ascending
    pub fn processes(&self) -> Vec<u32> {
        let mut pids: Vec<u32> = self.tables.keys().copied().collect();
        pids.sort_unstable();
        pids
    }

    pub fn valid_mappings(&self) -> impl Iterator<Item = (PageKey, &PageTableEntry)> + '_ {
        self.tables.iter().flat_map(|(&pid, table)| {
            table
                .iter()
                .filter(|(_, pte)| pte.valid)
                .map(move |(&vpn, pte)| (PageKey::new(pid, vpn), pte))
        })
    }

    pub fn entry_count(&self) -> usize {
        self.tables.values().map(BTreeMap::len).sum()
    }
}
