use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::constants::*;
use crate::error::{Result, SimError};

/// Frame replacement algorithm, chosen once per configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Algorithm {
    Fifo,
    Lru,
    Clock,
}

impl Algorithm {
    pub fn name(&self) -> &'static str {
        match self {
            Algorithm::Fifo => "FIFO",
            Algorithm::Lru => "LRU",
            Algorithm::Clock => "CLOCK",
        }
    }
}

impl FromStr for Algorithm {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "FIFO" => Ok(Algorithm::Fifo),
            "LRU" => Ok(Algorithm::Lru),
            "CLOCK" => Ok(Algorithm::Clock),
            _ => Err(SimError::UnknownAlgorithm(s.to_string())),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Machine configuration. Frame count is derived, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SimConfig {
    pub ram_size: u64,
    pub page_size: u64,
    pub tlb_capacity: usize,
    pub algorithm: Algorithm,
}

impl SimConfig {
    pub fn new(ram_size: u64, page_size: u64, tlb_capacity: usize, algorithm: Algorithm) -> Self {
        SimConfig { ram_size, page_size, tlb_capacity, algorithm }
    }

    /// Configuration with exactly `frames` frames of the default page size
    pub fn with_frames(frames: usize, tlb_capacity: usize, algorithm: Algorithm) -> Self {
        Self::new(frames as u64 * DEFAULT_PAGE_SIZE, DEFAULT_PAGE_SIZE, tlb_capacity, algorithm)
    }

    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(SimError::ZeroPageSize);
        }
        if !self.page_size.is_power_of_two() {
            return Err(SimError::PageSizeNotPowerOfTwo(self.page_size));
        }
        if self.ram_size == 0 {
            return Err(SimError::ZeroRamSize);
        }
        if self.ram_size % self.page_size != 0 {
            return Err(SimError::RamNotPageMultiple { ram: self.ram_size, page: self.page_size });
        }
        let frames = self.ram_size / self.page_size;
        if frames > MAX_FRAMES {
            return Err(SimError::TooManyFrames { frames, max: MAX_FRAMES });
        }
        if self.tlb_capacity == 0 {
            return Err(SimError::ZeroTlbCapacity);
        }
        Ok(())
    }

    /// Number of physical frames (ram / page size)
    pub fn frame_count(&self) -> usize {
        if self.page_size == 0 {
            return 0;
        }
        (self.ram_size / self.page_size) as usize
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig::new(DEFAULT_RAM_SIZE, DEFAULT_PAGE_SIZE, DEFAULT_TLB_CAPACITY, Algorithm::Clock)
    }
}

impl fmt::Display for SimConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "RAM:         {} bytes ({} frames)", self.ram_size, self.frame_count())?;
        writeln!(f, "Page size:   {} bytes", self.page_size)?;
        writeln!(f, "TLB:         {} entries", self.tlb_capacity)?;
        write!(f, "Replacement: {}", self.algorithm)
    }
}

/// Parse a memory size such as `64MB`, `512K` or `4096` (bytes).
pub fn parse_size(input: &str) -> Result<u64> {
    let s = input.trim();
    let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let (digits, unit) = s.split_at(split);

    let value: u64 = digits
        .parse()
        .map_err(|_| SimError::InvalidSize(input.to_string()))?;

    let multiplier = match unit.trim().to_ascii_uppercase().as_str() {
        "" | "B" => 1,
        "K" | "KB" => KIB,
        "M" | "MB" => MIB,
        "G" | "GB" => GIB,
        _ => return Err(SimError::InvalidSize(input.to_string())),
    };

    value
        .checked_mul(multiplier)
        .ok_or_else(|| SimError::InvalidSize(input.to_string()))
}
