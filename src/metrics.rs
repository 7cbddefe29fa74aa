use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::constants::*;

/// Counters of a single process
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProcessMetrics {
    pub accesses: u64,
    pub reads: u64,
    pub writes: u64,
    pub page_faults: u64,
    pub tlb_hits: u64,
    pub tlb_misses: u64,
}

/// Running counters. Only ever increase; a reset replaces the whole value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metrics {
    pub total_accesses: u64,
    pub reads: u64,
    pub writes: u64,
    pub page_faults: u64,
    pub major_faults: u64,
    pub minor_faults: u64,
    pub tlb_hits: u64,
    pub tlb_misses: u64,
    pub swap_ins: u64,
    pub swap_outs: u64,
    pub replacements: u64,
    pub per_process: BTreeMap<u32, ProcessMetrics>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_access(&mut self, pid: u32, is_write: bool) {
        self.total_accesses += 1;
        let process = self.per_process.entry(pid).or_default();
        process.accesses += 1;
        if is_write {
            self.writes += 1;
            process.writes += 1;
        } else {
            self.reads += 1;
            process.reads += 1;
        }
    }

    pub fn record_tlb_hit(&mut self, pid: u32) {
        self.tlb_hits += 1;
        self.per_process.entry(pid).or_default().tlb_hits += 1;
    }

    pub fn record_tlb_miss(&mut self, pid: u32) {
        self.tlb_misses += 1;
        self.per_process.entry(pid).or_default().tlb_misses += 1;
    }

    /// A major fault has to read the page back from swap; a minor one does not.
    pub fn record_page_fault(&mut self, pid: u32, major: bool) {
        self.page_faults += 1;
        if major {
            self.major_faults += 1;
        } else {
            self.minor_faults += 1;
        }
        self.per_process.entry(pid).or_default().page_faults += 1;
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            total_accesses: self.total_accesses,
            reads: self.reads,
            writes: self.writes,
            page_faults: self.page_faults,
            major_faults: self.major_faults,
            minor_faults: self.minor_faults,
            tlb_hits: self.tlb_hits,
            tlb_misses: self.tlb_misses,
            swap_ins: self.swap_ins,
            swap_outs: self.swap_outs,
            replacements: self.replacements,
            fault_rate: percent(self.page_faults, self.total_accesses),
            tlb_hit_rate: percent(self.tlb_hits, self.tlb_hits + self.tlb_misses),
            per_process: self.per_process.clone(),
        }
    }
}

fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 { 0.0 } else { part as f64 * 100.0 / whole as f64 }
}

/// Latencies used to estimate the average memory access time
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AccessTimes {
    pub tlb_hit_ns: f64,
    pub memory_ns: f64,
    pub page_fault_us: f64,
}

impl Default for AccessTimes {
    fn default() -> Self {
        AccessTimes {
            tlb_hit_ns: TLB_HIT_TIME_NS,
            memory_ns: MEMORY_ACCESS_TIME_NS,
            page_fault_us: PAGE_FAULT_TIME_US,
        }
    }
}

/// Read-only view of the counters plus derived rates (in percent)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub total_accesses: u64,
    pub reads: u64,
    pub writes: u64,
    pub page_faults: u64,
    pub major_faults: u64,
    pub minor_faults: u64,
    pub tlb_hits: u64,
    pub tlb_misses: u64,
    pub swap_ins: u64,
    pub swap_outs: u64,
    pub replacements: u64,
    pub fault_rate: f64,
    pub tlb_hit_rate: f64,
    pub per_process: BTreeMap<u32, ProcessMetrics>,
}

impl MetricsSnapshot {
    pub fn fault_rate_display(&self) -> String {
        format!("{:.2}", self.fault_rate)
    }

    pub fn tlb_hit_rate_display(&self) -> String {
        format!("{:.2}", self.tlb_hit_rate)
    }

    /// AMT = TLB hit time + TLB miss ratio × memory time + fault ratio × fault time
    pub fn avg_access_time_ns(&self, times: &AccessTimes) -> f64 {
        if self.total_accesses == 0 {
            return 0.0;
        }
        let tlb_miss_ratio = 1.0 - self.tlb_hit_rate / 100.0;
        let fault_ratio = self.fault_rate / 100.0;
        times.tlb_hit_ns + tlb_miss_ratio * times.memory_ns + fault_ratio * times.page_fault_us * 1000.0
    }

    /// AMT relative to a pure TLB hit
    pub fn slowdown(&self, times: &AccessTimes) -> f64 {
        if times.tlb_hit_ns <= 0.0 {
            return 0.0;
        }
        self.avg_access_time_ns(times) / times.tlb_hit_ns
    }

    /// Per-process table, one row per PID
    pub fn per_process_table(&self) -> String {
        let mut out = String::new();
        out.push_str("  PID | Accesses  | Reads     | Writes    | Faults    | TLB Hits  | TLB Misses\n");
        out.push_str("------+-----------+-----------+-----------+-----------+-----------+-----------\n");
        for (pid, p) in &self.per_process {
            out.push_str(&format!(
                " {:4} | {:9} | {:9} | {:9} | {:9} | {:9} | {:9}\n",
                pid, p.accesses, p.reads, p.writes, p.page_faults, p.tlb_hits, p.tlb_misses
            ));
        }
        out
    }
}

impl fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Memory Accesses:")?;
        writeln!(f, "  Total:        {:12}", self.total_accesses)?;
        writeln!(f, "  Reads:        {:12}", self.reads)?;
        writeln!(f, "  Writes:       {:12}", self.writes)?;
        writeln!(f)?;
        writeln!(f, "Page Faults:")?;
        writeln!(f, "  Total:        {:12}", self.page_faults)?;
        writeln!(f, "  Major:        {:12}", self.major_faults)?;
        writeln!(f, "  Minor:        {:12}", self.minor_faults)?;
        writeln!(f, "  Fault Rate:   {:>11}%", self.fault_rate_display())?;
        writeln!(f)?;
        writeln!(f, "TLB Performance:")?;
        writeln!(f, "  Hits:         {:12}", self.tlb_hits)?;
        writeln!(f, "  Misses:       {:12}", self.tlb_misses)?;
        writeln!(f, "  Hit Rate:     {:>11}%", self.tlb_hit_rate_display())?;
        writeln!(f)?;
        writeln!(f, "Swap I/O:")?;
        writeln!(f, "  Swap-ins:     {:12}", self.swap_ins)?;
        writeln!(f, "  Swap-outs:    {:12}", self.swap_outs)?;
        write!(f, "  Replacements: {:12}", self.replacements)
    }
}
