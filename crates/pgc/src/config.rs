//! Configuration Module - Collector Tuning Parameters
//!
//! Manages the parameters fixed at collector construction: the back-end
//! strategy, the partition geometry, the root table capacity, and the
//! diagnostic event stream switch.

use crate::object::header::{HEADER_SIZE, WORD_SIZE};

/// Default partition capacity in bytes (1 MiB).
pub const DEFAULT_PARTITION_SIZE: usize = 0x100000;

/// Default number of slots in the root table.
pub const DEFAULT_REF_TABLE_CAPACITY: usize = 1024 / WORD_SIZE;

/// Collection strategy selected at construction
///
/// Both strategies share the same allocation, rooting, and tracing
/// interface; they differ only in how `collect` reclaims memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GcMode {
    /// Reclaim in place, producing size-classed free lists. Objects never
    /// move; raw payload pointers stay valid across collections.
    MarkSweep,
    /// Slide live blocks into a dense prefix of the heap, rewriting every
    /// reference. Only root slots survive a collection; raw payload
    /// pointers held outside the root table become dangling.
    MarkCompact,
}

impl GcMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            GcMode::MarkSweep => "mark-sweep",
            GcMode::MarkCompact => "mark-compact",
        }
    }
}

impl std::fmt::Display for GcMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Collector configuration
///
/// All parameters are fixed for the lifetime of the collector instance.
///
/// # Examples
///
/// ```rust
/// use pgc::{GcConfig, GcMode};
///
/// // Default configuration: mark-compact, 1 MiB partitions
/// let config = GcConfig::default();
/// assert!(config.validate().is_ok());
///
/// // Small partitions, sweeping collector
/// let config = GcConfig {
///     mode: GcMode::MarkSweep,
///     partition_size: 64 * 1024,
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct GcConfig {
    /// Collection strategy.
    ///
    /// Default: `GcMode::MarkCompact`
    pub mode: GcMode,

    /// Capacity of each heap partition in bytes.
    ///
    /// The largest single allocation is `partition_size` minus the block
    /// header. Rounded up to the system page size when a partition is
    /// actually mapped.
    ///
    /// Default: 1 MiB
    pub partition_size: usize,

    /// Number of slots in the root table.
    ///
    /// The table is allocated once and never grows; exhausting it is a
    /// fatal host error.
    ///
    /// Default: `1024 / size_of::<*mut u8>()`
    pub ref_table_capacity: usize,

    /// Emit diagnostic events to the configured sink.
    ///
    /// When false, no events are constructed or delivered.
    ///
    /// Default: false
    pub trace: bool,
}

impl Default for GcConfig {
    fn default() -> Self {
        GcConfig {
            mode: GcMode::MarkCompact,
            partition_size: DEFAULT_PARTITION_SIZE,
            ref_table_capacity: DEFAULT_REF_TABLE_CAPACITY,
            trace: false,
        }
    }
}

impl GcConfig {
    /// Validate configuration
    ///
    /// Checks that the partition geometry can hold at least one minimal
    /// block and that the root table is non-empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.partition_size < HEADER_SIZE + WORD_SIZE {
            return Err(ConfigError::InvalidPartitionSize(format!(
                "partition_size must be at least {} bytes",
                HEADER_SIZE + WORD_SIZE
            )));
        }

        if self.partition_size % WORD_SIZE != 0 {
            return Err(ConfigError::InvalidPartitionSize(
                "partition_size must be a multiple of the pointer size".to_string(),
            ));
        }

        if self.ref_table_capacity == 0 {
            return Err(ConfigError::InvalidRefTableCapacity(
                "ref_table_capacity must be > 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Largest payload a single block may carry under this configuration.
    pub fn max_block_size(&self) -> usize {
        self.partition_size - HEADER_SIZE
    }
}

/// Error types for configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid partition size: {0}")]
    InvalidPartitionSize(String),

    #[error("invalid root table capacity: {0}")]
    InvalidRefTableCapacity(String),
}
