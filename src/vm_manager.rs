use log::{debug, error, info, trace};
use rand::Rng;

use crate::config::SimConfig;
use crate::error::{Result, SimError};
use crate::memory::{FrameStore, PageKey};
use crate::metrics::{Metrics, MetricsSnapshot};
use crate::page_table::PageTableSet;
use crate::replacement::ReplacementPolicy;
use crate::tlb::Tlb;
use crate::trace::{AccessRecord, TraceParams, TracePattern, generate};
use crate::translation::{AccessResult, Eviction, Step};

/// The simulated machine: TLB, page tables, frames, replacement state, counters and the trace
/// being played back. Everything is owned here and rebuilt on reset.
pub struct VmManager {
    config: SimConfig,
    tlb: Tlb,
    page_tables: PageTableSet,
    frames: FrameStore,
    policy: ReplacementPolicy,
    metrics: Metrics,
    clock: u64,
    trace: Vec<AccessRecord>,
    cursor: usize,
}

impl VmManager {
    pub fn new(config: SimConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: SimConfig) -> Self {
        let frame_count = config.frame_count();
        info!(
            "VMM reset: {} bytes RAM, {} byte pages = {} frames, TLB {}, {}",
            config.ram_size, config.page_size, frame_count, config.tlb_capacity, config.algorithm
        );

        VmManager {
            tlb: Tlb::new(config.tlb_capacity),
            page_tables: PageTableSet::new(),
            frames: FrameStore::new(frame_count),
            policy: ReplacementPolicy::new(config.algorithm),
            metrics: Metrics::new(),
            clock: 0,
            trace: Vec::new(),
            cursor: 0,
            config,
        }
    }

    /// Rebuild every structure from `config`, dropping the trace.
    /// On error the current state is left untouched.
    pub fn reset(&mut self, config: SimConfig) -> Result<()> {
        *self = Self::new(config)?;
        Ok(())
    }

    /// Rebuild every structure under the current configuration but keep the trace, rewound
    pub fn restart(&mut self) {
        let trace = std::mem::take(&mut self.trace);
        *self = Self::build(self.config.clone());
        self.trace = trace;
    }

    /// Replace the trace with a freshly generated one. Nothing is executed.
    pub fn generate_trace<R: Rng>(&mut self, pattern: TracePattern, count: usize, rng: &mut R) {
        self.generate_trace_with(pattern, count, TraceParams::default(), rng);
    }

    /// Like [`generate_trace`](Self::generate_trace) with a custom process count and virtual
    /// space. The frame count always comes from this machine.
    pub fn generate_trace_with<R: Rng>(
        &mut self,
        pattern: TracePattern,
        count: usize,
        params: TraceParams,
        rng: &mut R,
    ) {
        let params = TraceParams { frame_count: self.frames.len(), ..params };
        let records = generate(pattern, count, &params, rng);
        self.load_trace(records);
    }

    /// Replace the trace with `records`. Nothing is executed.
    pub fn load_trace(&mut self, records: Vec<AccessRecord>) {
        self.trace = records;
        self.cursor = 0;
    }

    /// Play the next trace entry
    pub fn step(&mut self) -> Result<Step> {
        let Some(&record) = self.trace.get(self.cursor) else {
            return Ok(Step::Done);
        };

        let result = self.access(record.pid, record.vpn, record.op.is_write())?;
        self.cursor += 1;

        Ok(Step::Advanced { record, result, step: self.cursor })
    }

    /// Play the rest of the trace, returning the number of steps taken
    pub fn run(&mut self) -> Result<usize> {
        let mut steps = 0;
        while let Step::Advanced { .. } = self.step()? {
            steps += 1;
        }
        Ok(steps)
    }

    /// Translate one access, updating every structure and counter.
    ///
    /// Nothing is recorded when the access fails: the clock and counters only move once a frame
    /// for the page is secured, so a failed `step` can be retried without double counting.
    pub fn access(&mut self, pid: u32, vpn: u32, is_write: bool) -> Result<AccessResult> {
        let now = self.clock + 1;

        // Step 1: TLB
        if let Some(pfn) = self.tlb.lookup(pid, vpn, now) {
            self.begin_access(pid, is_write, now);
            self.metrics.record_tlb_hit(pid);
            self.touch(pid, vpn, pfn, is_write);
            trace!("PID{} VPN {}: TLB hit -> frame {}", pid, vpn, pfn);
            return Ok(AccessResult::tlb_hit(pfn));
        }

        // Step 2: page table
        let resident = self
            .page_tables
            .lookup(pid, vpn)
            .filter(|pte| pte.valid)
            .map(|pte| pte.pfn);
        if let Some(pfn) = resident {
            self.begin_access(pid, is_write, now);
            self.metrics.record_tlb_miss(pid);
            self.tlb.insert(pid, vpn, pfn, now);
            self.touch(pid, vpn, pfn, is_write);
            trace!("PID{} VPN {}: PT hit -> frame {}", pid, vpn, pfn);
            return Ok(AccessResult::page_table_hit(pfn));
        }

        // Step 3: page fault
        let (pfn, needs_eviction) = self.claim_frame(pid, vpn)?;
        self.begin_access(pid, is_write, now);
        self.metrics.record_tlb_miss(pid);
        Ok(self.handle_page_fault(pid, vpn, is_write, pfn, needs_eviction))
    }

    fn begin_access(&mut self, pid: u32, is_write: bool, now: u64) {
        self.clock = now;
        self.metrics.record_access(pid, is_write);
    }

    fn touch(&mut self, pid: u32, vpn: u32, pfn: usize, is_write: bool) {
        self.frames.frame_mut(pfn).touch(self.clock, is_write);
        if is_write {
            self.page_tables.mark_dirty(pid, vpn);
        }
    }

    /// A free frame, or the victim chosen by the replacement policy (second field `true`)
    fn claim_frame(&mut self, pid: u32, vpn: u32) -> Result<(usize, bool)> {
        if let Some(pfn) = self.frames.allocate() {
            return Ok((pfn, false));
        }
        match self.policy.select_victim(&mut self.frames) {
            Some(victim) => Ok((victim, true)),
            None => {
                error!("No free frame and no victim for PID{} VPN {}", pid, vpn);
                Err(SimError::AllocationImpossible { pid, vpn })
            }
        }
    }

    fn handle_page_fault(
        &mut self,
        pid: u32,
        vpn: u32,
        is_write: bool,
        pfn: usize,
        needs_eviction: bool,
    ) -> AccessResult {
        let major = self.page_tables.lookup(pid, vpn).is_some_and(|pte| pte.swapped);
        self.metrics.record_page_fault(pid, major);
        debug!(
            "{} page fault: PID{} VPN {} ({})",
            if major { "Major" } else { "Minor" },
            pid,
            vpn,
            if is_write { "W" } else { "R" }
        );

        let evicted = if needs_eviction { self.evict(pfn) } else { None };

        self.frames.frame_mut(pfn).assign(PageKey::new(pid, vpn), self.clock, is_write);
        self.page_tables.map(pid, vpn, pfn);
        if is_write {
            self.page_tables.mark_dirty(pid, vpn);
        }
        self.tlb.insert(pid, vpn, pfn, self.clock);
        self.policy.on_allocate(pfn);

        // First-time loads count as swap-ins
        if evicted.is_none() {
            self.metrics.swap_ins += 1;
        }

        debug!("Mapped PID{} VPN {} -> frame {}", pid, vpn, pfn);
        AccessResult::page_fault(pfn, evicted)
    }

    /// Unmap the current owner of `pfn`
    fn evict(&mut self, pfn: usize) -> Option<Eviction> {
        let frame = self.frames.frame(pfn)?;
        let owner = frame.owner?;
        let eviction = Eviction { pid: owner.pid, vpn: owner.vpn, pfn, dirty: frame.dirty };

        if eviction.dirty {
            self.page_tables.swap_out(owner.pid, owner.vpn);
            self.metrics.swap_outs += 1;
        } else {
            self.page_tables.invalidate(owner.pid, owner.vpn);
        }
        self.tlb.invalidate(owner.pid, owner.vpn);
        self.metrics.replacements += 1;

        debug!(
            "Evicted PID{} VPN {} from frame {}{}",
            owner.pid,
            owner.vpn,
            pfn,
            if eviction.dirty { " (swap-out)" } else { "" }
        );
        Some(eviction)
    }

    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn tlb(&self) -> &Tlb {
        &self.tlb
    }

    pub fn page_tables(&self) -> &PageTableSet {
        &self.page_tables
    }

    pub fn frames(&self) -> &FrameStore {
        &self.frames
    }

    pub fn policy(&self) -> &ReplacementPolicy {
        &self.policy
    }

    pub fn trace(&self) -> &[AccessRecord] {
        &self.trace
    }

    /// Number of trace entries already played
    pub fn position(&self) -> usize {
        self.cursor
    }

    pub fn remaining(&self) -> usize {
        self.trace.len() - self.cursor
    }

    /// Logical clock; equals the number of accesses since the last reset
    pub fn clock(&self) -> u64 {
        self.clock
    }

    /// Cross-check frames, page tables and TLB. Returns one message per broken invariant.
    pub fn consistency_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();

        for frame in self.frames.occupied() {
            let Some(owner) = frame.owner else { continue };
            match self.page_tables.lookup(owner.pid, owner.vpn) {
                Some(pte) if pte.valid && pte.pfn == frame.number => {}
                _ => errors.push(format!(
                    "frame {} owned by PID{} VPN {} has no valid PTE pointing back",
                    frame.number, owner.pid, owner.vpn
                )),
            }
        }

        for (key, pte) in self.page_tables.valid_mappings() {
            match self.frames.frame(pte.pfn) {
                Some(frame) if frame.owner == Some(key) => {}
                _ => errors.push(format!(
                    "PTE PID{} VPN {} points to frame {} which it does not own",
                    key.pid, key.vpn, pte.pfn
                )),
            }
        }

        let valid: Vec<_> = self.tlb.entries().iter().filter(|e| e.valid).collect();
        for (i, entry) in valid.iter().enumerate() {
            if valid[i + 1..].iter().any(|o| o.pid == entry.pid && o.vpn == entry.vpn) {
                errors.push(format!("duplicate TLB entry for PID{} VPN {}", entry.pid, entry.vpn));
            }
            match self.page_tables.lookup(entry.pid, entry.vpn) {
                Some(pte) if pte.valid && pte.pfn == entry.pfn => {}
                _ => errors.push(format!(
                    "TLB entry PID{} VPN {} -> frame {} is stale",
                    entry.pid, entry.vpn, entry.pfn
                )),
            }
        }

        errors
    }
}
