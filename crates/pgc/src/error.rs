//! Error Module - Collector Error Types
//!
//! Defines all error types used by the collector. None of these errors is
//! recoverable: each one reports either a programming error in the host
//! (oversized allocation, exhausted root table) or an allocation failure in
//! the underlying virtual-memory mapping. Callers are expected to treat an
//! `Err` the way a C runtime would treat an abort.

use thiserror::Error;

/// Main error type for all collector operations
#[derive(Debug, Error)]
pub enum GcError {
    #[error("allocation of {requested} bytes exceeds partition capacity ({limit} usable bytes)")]
    AllocationTooLarge { requested: usize, limit: usize },

    #[error("root table full: all {capacity} reference slots are in use")]
    RootTableFull { capacity: usize },

    #[error("out of memory: failed to map a {requested}-byte partition")]
    OutOfMemory {
        requested: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl GcError {
    /// Check if this error indicates a bug in the host program rather than
    /// resource exhaustion.
    pub fn is_host_bug(&self) -> bool {
        matches!(
            self,
            GcError::AllocationTooLarge { .. } | GcError::RootTableFull { .. }
        )
    }
}

/// Result type alias for collector operations
pub type Result<T> = std::result::Result<T, GcError>;
