use std::fmt;

use serde::Serialize;

use crate::trace::AccessRecord;

/// Page pushed out of memory to make room for a faulting page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Eviction {
    pub pid: u32,
    pub vpn: u32,
    pub pfn: usize,
    pub dirty: bool,
}

/// Outcome of translating one access
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AccessResult {
    pub tlb_hit: bool,
    pub page_fault: bool,
    pub pfn: usize,
    pub evicted: Option<Eviction>,
}

impl AccessResult {
    pub fn tlb_hit(pfn: usize) -> Self {
        AccessResult { tlb_hit: true, page_fault: false, pfn, evicted: None }
    }

    pub fn page_table_hit(pfn: usize) -> Self {
        AccessResult { tlb_hit: false, page_fault: false, pfn, evicted: None }
    }

    pub fn page_fault(pfn: usize, evicted: Option<Eviction>) -> Self {
        AccessResult { tlb_hit: false, page_fault: true, pfn, evicted }
    }
}

impl fmt::Display for AccessResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.tlb_hit {
            return write!(f, "TLB hit -> frame {}", self.pfn);
        }
        if !self.page_fault {
            return write!(f, "PT hit -> frame {}", self.pfn);
        }
        write!(f, "page fault -> frame {}", self.pfn)?;
        if let Some(ev) = &self.evicted {
            write!(
                f,
                " [evicted PID{} VPN {}{}]",
                ev.pid,
                ev.vpn,
                if ev.dirty { ", dirty" } else { "" }
            )?;
        }
        Ok(())
    }
}

/// Result of advancing the simulation by one trace entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Step {
    /// The trace is exhausted
    Done,
    Advanced {
        record: AccessRecord,
        result: AccessResult,
        /// 1-based number of this step within the trace
        step: usize,
    },
}

impl Step {
    pub fn is_done(&self) -> bool {
        matches!(self, Step::Done)
    }
}
