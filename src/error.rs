use thiserror::Error;

/// Result type alias for simulator operations
pub type Result<T> = std::result::Result<T, SimError>;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("page size must be greater than zero")]
    ZeroPageSize,

    #[error("page size {0} is not a power of two")]
    PageSizeNotPowerOfTwo(u64),

    #[error("RAM size must be greater than zero")]
    ZeroRamSize,

    #[error("RAM size {ram} is not a multiple of page size {page}")]
    RamNotPageMultiple { ram: u64, page: u64 },

    #[error("{frames} frames requested, at most {max} supported")]
    TooManyFrames { frames: u64, max: u64 },

    #[error("TLB capacity must be greater than zero")]
    ZeroTlbCapacity,

    #[error("invalid size: {0}")]
    InvalidSize(String),

    #[error("unknown trace pattern: {0}")]
    UnknownPattern(String),

    #[error("unknown replacement algorithm: {0}")]
    UnknownAlgorithm(String),

    /// Page fault with an empty free list and no evictable frame
    #[error("no frame available for PID {pid} VPN {vpn}")]
    AllocationImpossible { pid: u32, vpn: u32 },

    #[error("trace line {line}: {reason}")]
    TraceParse { line: usize, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
