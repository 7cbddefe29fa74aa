// Synthetic trace shape
pub const NUM_PROCESSES: u32 = 4;
pub const VIRTUAL_PAGES: u32 = 512;
pub const DEFAULT_ACCESSES: usize = 10_000;

pub const SEQUENTIAL_SPAN: u32 = 256;
pub const SEQUENTIAL_PID_RUN: usize = 100;
pub const SEQUENTIAL_READ_RATIO: f64 = 0.8;

pub const RANDOM_READ_RATIO: f64 = 0.75;

pub const WORKING_SET_REGION: u32 = 256;
pub const WORKING_SET_WINDOW: u32 = 64;
pub const WORKING_SET_HIT_RATIO: f64 = 0.9;
pub const WORKING_SET_DRIFT_PERIOD: usize = 500;
pub const WORKING_SET_DRIFT: u32 = 16;
pub const WORKING_SET_READ_RATIO: f64 = 0.7;

pub const LOCALITY_NEAR_RATIO: f64 = 0.7;
pub const LOCALITY_STEP_MIN: i64 = -4;
pub const LOCALITY_STEP_MAX: i64 = 3;
pub const LOCALITY_PID_RUN: usize = 50;
pub const LOCALITY_READ_RATIO: f64 = 0.75;

/// Thrashing traces touch this many pages per physical frame (as a ratio 3/2).
pub const THRASHING_NUM: usize = 3;
pub const THRASHING_DEN: usize = 2;

// Machine defaults
pub const KIB: u64 = 1024;
pub const MIB: u64 = 1024 * KIB;
pub const GIB: u64 = 1024 * MIB;

pub const DEFAULT_RAM_SIZE: u64 = 64 * MIB;
pub const DEFAULT_PAGE_SIZE: u64 = 4096;
pub const DEFAULT_TLB_CAPACITY: usize = 64;

/// Upper bound on simulated frames (4 GiB of 4 KiB pages)
pub const MAX_FRAMES: u64 = 1 << 20;

// Access time model
pub const TLB_HIT_TIME_NS: f64 = 1.0;
pub const MEMORY_ACCESS_TIME_NS: f64 = 100.0;
pub const PAGE_FAULT_TIME_US: f64 = 1000.0;
