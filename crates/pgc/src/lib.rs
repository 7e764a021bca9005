//! # PGC - Precise Relocating Garbage Collector
//!
//! PGC is a small, precise, tracing garbage collector for host programs
//! that allocate long-lived, relocatable objects from a managed heap. Two
//! interchangeable back ends, mark-sweep and mark-compact, share one
//! allocation, rooting, and tracing interface.
//!
//! ## Overview
//!
//! - **Partitioned heap**: bump allocation out of a chain of fixed-size
//!   anonymous mappings that grows on demand and is reused after
//!   collection
//! - **Stable root handles**: the host holds addresses of slots in a
//!   fixed-capacity root table, not raw object pointers, so compaction can
//!   move objects freely
//! - **Uniform tracing**: one per-type callback enumerates an object's
//!   references, serving both marking and reference rewriting
//! - **Sliding compaction**: live blocks move into a dense prefix of the
//!   heap in their original order, with every reference rewritten first
//! - **Finalizers**: an optional per-type hook runs exactly once when an
//!   object is reclaimed
//!
//! ## Quick Start
//!
//! ```rust
//! use pgc::{GarbageCollector, GcConfig};
//!
//! fn main() -> pgc::Result<()> {
//!     let mut gc = GarbageCollector::new(GcConfig::default())?;
//!
//!     // Allocate an object and pin it through a root slot.
//!     let obj = gc.alloc(16, None)?;
//!     let root = gc.alloc_reference(obj)?;
//!     unsafe { *(obj as *mut u64) = 42 };
//!
//!     // Collection may move the object; re-read the slot afterwards.
//!     gc.collect();
//!     let obj = root.get();
//!     assert_eq!(unsafe { *(obj as *const u64) }, 42);
//!
//!     // Releasing the root makes the object collectable.
//!     gc.free_reference(root);
//!     gc.collect();
//!     Ok(())
//! }
//! ```
//!
//! ## Safety
//!
//! PGC hands out raw payload pointers and trusts the host to uphold the
//! tracing contract:
//!
//! 1. **Hold objects through root slots across collections.** In
//!    mark-compact mode a raw payload pointer is stale after `collect`;
//!    only root slot contents are rewritten.
//! 2. **Trace callbacks must enumerate every reference exactly once**,
//!    passing the address of each reference slot, and must not allocate
//!    or collect.
//! 3. **Reference slots hold null or a pointer to the first byte of a
//!    live managed payload.** Interior pointers are not supported.
//! 4. **Finalizers must treat the payload as opaque bytes**: managed
//!    references inside a dead payload are stale when the finalizer runs.
//!
//! ## Modules
//!
//! - [`gc`]: collector façade and cycle orchestration
//! - [`config`]: construction-time parameters and validation
//! - [`error`]: error types for all collector operations
//! - [`heap`]: partition chain, bump allocation, free lists
//! - [`object`]: block headers and per-type descriptors
//! - [`roots`]: fixed-capacity root table with stable handles
//! - [`marker`]: worklist marking from the root set
//! - [`sweep`]: in-place reclamation back end
//! - [`relocate`]: sliding compaction back end
//! - [`logging`]: diagnostic event stream
//! - [`stats`]: collection counters
//! - [`memory`]: raw-memory helpers

// Core GC modules
pub mod config;
pub mod error;
pub mod gc;

// Memory management
pub mod heap;
pub mod memory;
pub mod object;
pub mod roots;

// Collection back ends
pub mod marker;
pub mod relocate;
pub mod sweep;

// Runtime and monitoring
pub mod logging;
pub mod stats;

// Re-export main types for convenience
pub use config::{GcConfig, GcMode, DEFAULT_PARTITION_SIZE, DEFAULT_REF_TABLE_CAPACITY};
pub use error::{GcError, Result};
pub use gc::{GarbageCollector, GcState};
pub use logging::{ConsoleSink, EventSink, GcEvent, RecordingSink};
pub use object::{FinalizeFn, ObjectDescriptor, TraceFn, TraceOp};
pub use roots::RootRef;
pub use stats::GcStats;

/// Crate version string from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
