pub mod config;
pub mod constants;
pub mod error;
pub mod io;
pub mod logger;
pub mod memory;
pub mod metrics;
pub mod page_table;
pub mod replacement;
pub mod tlb;
pub mod trace;
pub mod translation;
pub mod vm_manager;

// Re-export commonly used items for convenience
pub use config::{Algorithm, SimConfig};
pub use error::{Result, SimError};
pub use metrics::{AccessTimes, MetricsSnapshot};
pub use trace::{AccessRecord, Operation, TracePattern};
pub use translation::{AccessResult, Eviction, Step};
pub use vm_manager::VmManager;
