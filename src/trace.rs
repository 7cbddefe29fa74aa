//! Synthetic access traces
//!
//! A trace is a finite, ordered list of [`AccessRecord`]s. Generation consumes randomness from
//! a caller-supplied [`Rng`]; playback does not, so a generated trace replays deterministically.

use std::fmt;
use std::str::FromStr;

use log::info;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::{Result, SimError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    Read,
    Write,
}

impl Operation {
    pub fn is_write(&self) -> bool {
        matches!(self, Operation::Write)
    }

    pub fn as_char(&self) -> char {
        match self {
            Operation::Read => 'R',
            Operation::Write => 'W',
        }
    }

    fn read_with_probability<R: Rng>(rng: &mut R, read_ratio: f64) -> Self {
        if rng.random_bool(read_ratio) { Operation::Read } else { Operation::Write }
    }
}

/// One memory access by one process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRecord {
    pub pid: u32,
    pub op: Operation,
    pub vpn: u32,
}

impl AccessRecord {
    pub fn new(pid: u32, op: Operation, vpn: u32) -> Self {
        AccessRecord { pid, op, vpn }
    }

    pub fn read(pid: u32, vpn: u32) -> Self {
        Self::new(pid, Operation::Read, vpn)
    }

    pub fn write(pid: u32, vpn: u32) -> Self {
        Self::new(pid, Operation::Write, vpn)
    }
}

impl fmt::Display for AccessRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PID{} {} VPN {}", self.pid, self.op.as_char(), self.vpn)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TracePattern {
    Sequential,
    Random,
    WorkingSet,
    Locality,
    Thrashing,
}

impl TracePattern {
    pub const ALL: [TracePattern; 5] = [
        TracePattern::Sequential,
        TracePattern::Random,
        TracePattern::WorkingSet,
        TracePattern::Locality,
        TracePattern::Thrashing,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            TracePattern::Sequential => "sequential",
            TracePattern::Random => "random",
            TracePattern::WorkingSet => "working_set",
            TracePattern::Locality => "locality",
            TracePattern::Thrashing => "thrashing",
        }
    }
}

impl FromStr for TracePattern {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        TracePattern::ALL
            .into_iter()
            .find(|p| p.name() == wanted)
            .ok_or_else(|| SimError::UnknownPattern(s.to_string()))
    }
}

impl fmt::Display for TracePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Shape of the virtual space a generated trace spans
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceParams {
    pub processes: u32,
    pub virtual_pages: u32,
    /// Physical frame count; only `thrashing` depends on it
    pub frame_count: usize,
}

impl TraceParams {
    pub fn for_frames(frame_count: usize) -> Self {
        TraceParams { frame_count, ..Default::default() }
    }
}

impl Default for TraceParams {
    fn default() -> Self {
        TraceParams { processes: NUM_PROCESSES, virtual_pages: VIRTUAL_PAGES, frame_count: 0 }
    }
}

/// Generate `count` accesses following `pattern`.
pub fn generate<R: Rng>(
    pattern: TracePattern,
    count: usize,
    params: &TraceParams,
    rng: &mut R,
) -> Vec<AccessRecord> {
    let processes = params.processes.max(1);
    let pages = params.virtual_pages.max(1);

    let trace = match pattern {
        TracePattern::Sequential => sequential(count, processes, pages, rng),
        TracePattern::Random => random(count, processes, pages, rng),
        TracePattern::WorkingSet => working_set(count, processes, pages, rng),
        TracePattern::Locality => locality(count, processes, pages, rng),
        TracePattern::Thrashing => thrashing(count, processes, pages, params.frame_count),
    };

    info!("Generated {} trace: {} accesses", pattern, trace.len());
    trace
}

/// Number of distinct pages a thrashing trace cycles through
pub fn thrashing_span(frame_count: usize) -> usize {
    (frame_count * THRASHING_NUM / THRASHING_DEN).max(1)
}

fn cycling_pid(i: usize, run: usize, processes: u32) -> u32 {
    ((i / run) % processes as usize) as u32
}

fn sequential<R: Rng>(count: usize, processes: u32, pages: u32, rng: &mut R) -> Vec<AccessRecord> {
    let span = SEQUENTIAL_SPAN.min(pages) as usize;
    (0..count)
        .map(|i| AccessRecord {
            pid: cycling_pid(i, SEQUENTIAL_PID_RUN, processes),
            op: Operation::read_with_probability(rng, SEQUENTIAL_READ_RATIO),
            vpn: (i % span) as u32,
        })
        .collect()
}

fn random<R: Rng>(count: usize, processes: u32, pages: u32, rng: &mut R) -> Vec<AccessRecord> {
    (0..count)
        .map(|_| {
            let pid = rng.random_range(0..processes);
            let op = Operation::read_with_probability(rng, RANDOM_READ_RATIO);
            let vpn = rng.random_range(0..pages);
            AccessRecord { pid, op, vpn }
        })
        .collect()
}

fn working_set<R: Rng>(count: usize, processes: u32, pages: u32, rng: &mut R) -> Vec<AccessRecord> {
    let mut bases: Vec<u32> = (0..processes)
        .map(|pid| ((pid as u64 * WORKING_SET_REGION as u64) % pages as u64) as u32)
        .collect();

    let mut trace = Vec::with_capacity(count);
    for i in 0..count {
        let pid = (i % processes as usize) as u32;
        let base = bases[pid as usize];

        let vpn = if rng.random_bool(WORKING_SET_HIT_RATIO) {
            wrap_add(base, rng.random_range(0..WORKING_SET_WINDOW), pages)
        } else {
            rng.random_range(0..pages)
        };
        let op = Operation::read_with_probability(rng, WORKING_SET_READ_RATIO);
        trace.push(AccessRecord { pid, op, vpn });

        if i % WORKING_SET_DRIFT_PERIOD == 0 {
            bases[pid as usize] = wrap_add(base, WORKING_SET_DRIFT, pages);
        }
    }
    trace
}

fn wrap_add(base: u32, offset: u32, pages: u32) -> u32 {
    ((base as u64 + offset as u64) % pages as u64) as u32
}

fn locality<R: Rng>(count: usize, processes: u32, pages: u32, rng: &mut R) -> Vec<AccessRecord> {
    let pages = pages as i64;
    let mut cursor: i64 = 0;

    (0..count)
        .map(|i| {
            cursor = if rng.random_bool(LOCALITY_NEAR_RATIO) {
                let offset = rng.random_range(LOCALITY_STEP_MIN..=LOCALITY_STEP_MAX);
                (cursor + offset).rem_euclid(pages)
            } else {
                rng.random_range(0..pages)
            };
            AccessRecord {
                pid: cycling_pid(i, LOCALITY_PID_RUN, processes),
                op: Operation::read_with_probability(rng, LOCALITY_READ_RATIO),
                vpn: cursor as u32,
            }
        })
        .collect()
}

fn thrashing(count: usize, processes: u32, pages: u32, frame_count: usize) -> Vec<AccessRecord> {
    let span = thrashing_span(frame_count).min(pages as usize);
    (0..count)
        .map(|i| AccessRecord::read(cycling_pid(i, 1, processes), (i % span) as u32))
        .collect()
}
