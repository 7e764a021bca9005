//! GC Core Module - The collector façade
//!
//! `GarbageCollector` ties the components together: the partition heap,
//! the root table, the worklist marker, and the configured back end. The
//! host interacts with four operations: `alloc`, `alloc_reference`,
//! `free_reference`, and `collect`.
//!
//! The collector is single-threaded and cooperative: the mutator and the
//! collector interleave on one thread, and the mutator yields only through
//! an explicit `collect` call. Every method takes `&mut self`, which also
//! statically rules out host callbacks re-entering the API mid-collection.

use indexmap::IndexMap;

use crate::config::{GcConfig, GcMode};
use crate::error::{GcError, Result};
use crate::heap::Heap;
use crate::logging::{ConsoleSink, EventSink, GcEvent, GcLogger};
use crate::marker::Marker;
use crate::object::header::{header_of, round_payload_size};
use crate::object::ObjectDescriptor;
use crate::roots::{RootRef, RootTable};
use crate::stats::GcStats;
use crate::{relocate, sweep};

/// Collection cycle state
///
/// Transitions happen only inside `collect`, which runs a full cycle
/// before returning; between calls the collector is always `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GcState {
    /// No collection in progress
    Idle,
    /// Tracing reachable blocks from the roots
    Marking,
    /// Sweep back end: reclaiming dead blocks in place
    Sweeping,
    /// Compact back end: computing forwarding addresses
    Planning,
    /// Compact back end: updating root and payload references
    Rewriting,
    /// Compact back end: sliding live blocks into place
    Relocating,
}

/// Precise, relocating garbage collector
///
/// Owns the heap, the root table, and the collection machinery. Created
/// once per managed heap; dropping it unmaps every partition (without
/// running finalizers).
///
/// # Pointer validity
///
/// `alloc` returns a raw payload pointer. In mark-compact mode that
/// pointer is only valid until the next `collect`; the host must hold
/// objects through root slots (`alloc_reference`) and re-read the slot
/// after collecting. In mark-sweep mode objects never move, but anything
/// not reachable from a root slot is reclaimed.
pub struct GarbageCollector {
    heap: Heap,
    roots: RootTable,
    marker: Marker,
    config: GcConfig,
    logger: GcLogger,
    stats: GcStats,
    state: GcState,
    cycle_count: u64,
}

impl GarbageCollector {
    /// Create a collector with the given configuration
    ///
    /// When `config.trace` is set, diagnostic events go to a
    /// [`ConsoleSink`]; use [`with_sink`] to install a custom sink.
    ///
    /// [`with_sink`]: GarbageCollector::with_sink
    pub fn new(config: GcConfig) -> Result<Self> {
        let logger = if config.trace {
            GcLogger::new(true, Box::new(ConsoleSink::default()))
        } else {
            GcLogger::disabled()
        };
        Self::build(config, logger)
    }

    /// Create a collector that reports events to `sink`
    ///
    /// Event emission is enabled regardless of `config.trace`.
    pub fn with_sink(config: GcConfig, sink: Box<dyn EventSink>) -> Result<Self> {
        Self::build(config, GcLogger::new(true, sink))
    }

    fn build(config: GcConfig, logger: GcLogger) -> Result<Self> {
        config
            .validate()
            .map_err(|e| GcError::Configuration(e.to_string()))?;

        Ok(Self {
            heap: Heap::new(config.partition_size),
            roots: RootTable::new(config.ref_table_capacity),
            marker: Marker::new(),
            config,
            logger,
            stats: GcStats::new(),
            state: GcState::Idle,
            cycle_count: 0,
        })
    }

    /// Allocate a zeroed block and return its payload pointer
    ///
    /// The size is rounded up to pointer alignment (zero rounds up to one
    /// word). Allocation never triggers a collection.
    ///
    /// # Errors
    ///
    /// `AllocationTooLarge` if the block cannot fit in a single partition,
    /// `OutOfMemory` if mapping a new partition fails. Both are
    /// unrecoverable.
    pub fn alloc(
        &mut self,
        size: usize,
        descriptor: Option<&'static ObjectDescriptor>,
    ) -> Result<*mut u8> {
        let payload_size = round_payload_size(size);

        let payload = match self.config.mode {
            GcMode::MarkSweep => {
                match self.heap.alloc_from_free_list(payload_size, descriptor) {
                    Some(payload) => payload,
                    None => {
                        self.heap.ensure_capacity(
                            payload_size,
                            &mut self.logger,
                            &mut self.stats,
                        )?;
                        self.heap.bump_block(payload_size, descriptor)
                    },
                }
            },
            GcMode::MarkCompact => {
                self.heap
                    .ensure_capacity(payload_size, &mut self.logger, &mut self.stats)?;
                self.heap.bump_block(payload_size, descriptor)
            },
        };

        // A reused free block may be larger than requested.
        let actual = unsafe { (*header_of(payload)).size };
        self.stats.record_alloc(actual);
        self.logger.emit(GcEvent::BlockAllocated {
            addr: payload as usize,
            size: actual,
        });
        Ok(payload)
    }

    /// Claim a root slot holding `payload` and return its stable handle
    ///
    /// The handle's address never changes; its content is rewritten by
    /// compacting collections. `payload` may be null.
    ///
    /// # Errors
    ///
    /// `RootTableFull` when every slot is in use; the table has a fixed
    /// capacity, so this is an unrecoverable host error.
    pub fn alloc_reference(&mut self, payload: *mut u8) -> Result<RootRef> {
        self.roots.alloc_reference(payload)
    }

    /// Release a root slot
    ///
    /// The object it referenced becomes collectable unless reachable some
    /// other way. Passing a handle not returned by `alloc_reference` on
    /// this collector is a host error.
    pub fn free_reference(&mut self, slot: RootRef) {
        self.roots.free_reference(slot);
    }

    /// Run one full collection cycle synchronously
    ///
    /// Marks from the root table, then reclaims with the configured back
    /// end. Finalizers of dead blocks run during the cycle, in
    /// age-then-address order. Returns once the cycle is complete.
    pub fn collect(&mut self) {
        let cycle = self.cycle_count;
        self.logger.emit(GcEvent::CycleStart {
            cycle,
            mode: self.config.mode.as_str(),
        });
        log::debug!("gc cycle {} started ({})", cycle, self.config.mode);
        let reclaimed_before = self.stats.bytes_reclaimed;

        self.state = GcState::Marking;
        let live = self.marker.mark_from_roots(&self.roots, &mut self.logger);

        match self.config.mode {
            GcMode::MarkSweep => {
                self.state = GcState::Sweeping;
                sweep::sweep(&mut self.heap, &mut self.logger, &mut self.stats);
            },
            GcMode::MarkCompact => {
                self.state = GcState::Planning;
                let active = relocate::plan(&mut self.heap);

                self.state = GcState::Rewriting;
                relocate::rewrite_roots(&self.roots, &mut self.logger);
                relocate::rewrite_heap(&self.heap, &mut self.logger);

                self.state = GcState::Relocating;
                relocate::relocate(&mut self.heap, &mut self.logger, &mut self.stats);
                self.heap.set_active(active);
            },
        }

        self.state = GcState::Idle;
        self.stats.record_cycle();
        self.cycle_count += 1;

        let reclaimed = self.stats.bytes_reclaimed - reclaimed_before;
        self.logger.emit(GcEvent::CycleEnd {
            cycle,
            live_blocks: live,
            reclaimed_bytes: reclaimed,
        });
        log::debug!(
            "gc cycle {} completed: {} live blocks, {} bytes reclaimed",
            cycle,
            live,
            reclaimed
        );
    }

    /// Current cycle state; always `Idle` between `collect` calls
    pub fn state(&self) -> GcState {
        self.state
    }

    /// Completed collection cycles
    pub fn cycle_count(&self) -> u64 {
        self.cycle_count
    }

    pub fn config(&self) -> &GcConfig {
        &self.config
    }

    pub fn stats(&self) -> &GcStats {
        &self.stats
    }

    /// The managed heap, for inspection and layout verification
    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    /// The root table, for inspection
    pub fn roots(&self) -> &RootTable {
        &self.roots
    }

    /// Snapshot of collector internals for debugging and monitoring
    pub fn diagnostics(&self) -> IndexMap<String, String> {
        let mut diagnostics = IndexMap::new();

        diagnostics.insert("mode".to_string(), self.config.mode.to_string());
        diagnostics.insert("state".to_string(), format!("{:?}", self.state));
        diagnostics.insert("cycle_count".to_string(), self.cycle_count.to_string());
        diagnostics.insert(
            "partition_count".to_string(),
            self.heap.partition_count().to_string(),
        );
        diagnostics.insert(
            "active_partition".to_string(),
            self.heap.active().to_string(),
        );
        diagnostics.insert(
            "heap_used_bytes".to_string(),
            self.heap.used_bytes().to_string(),
        );
        diagnostics.insert(
            "free_list_blocks".to_string(),
            self.heap.free_list_blocks().to_string(),
        );
        diagnostics.insert(
            "root_slots_used".to_string(),
            format!("{}/{}", self.roots.live_count(), self.roots.capacity()),
        );

        diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config(mode: GcMode) -> GcConfig {
        GcConfig {
            mode,
            partition_size: 4096,
            ref_table_capacity: 16,
            trace: false,
        }
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = GcConfig {
            ref_table_capacity: 0,
            ..Default::default()
        };
        assert!(matches!(
            GarbageCollector::new(config),
            Err(GcError::Configuration(_))
        ));
    }

    #[test]
    fn test_alloc_returns_zeroed_distinct_payloads() {
        let mut gc = GarbageCollector::new(small_config(GcMode::MarkCompact)).unwrap();

        let a = gc.alloc(0, None).unwrap();
        let b = gc.alloc(0, None).unwrap();
        assert_ne!(a, b);
        assert_eq!(a as usize % std::mem::size_of::<usize>(), 0);

        let c = gc.alloc(24, None).unwrap();
        let bytes = unsafe { std::slice::from_raw_parts(c, 24) };
        assert!(bytes.iter().all(|&byte| byte == 0));
    }

    #[test]
    fn test_collect_on_empty_heap() {
        let mut gc = GarbageCollector::new(small_config(GcMode::MarkCompact)).unwrap();
        gc.collect();
        gc.collect();
        assert_eq!(gc.cycle_count(), 2);
        assert_eq!(gc.state(), GcState::Idle);
    }

    #[test]
    fn test_unrooted_blocks_reclaimed() {
        for mode in [GcMode::MarkSweep, GcMode::MarkCompact] {
            let mut gc = GarbageCollector::new(small_config(mode)).unwrap();
            gc.alloc(32, None).unwrap();
            gc.alloc(32, None).unwrap();
            gc.collect();
            assert_eq!(gc.stats().blocks_reclaimed, 2);
            gc.heap().verify();
        }
    }

    #[test]
    fn test_diagnostics_snapshot() {
        let mut gc = GarbageCollector::new(small_config(GcMode::MarkSweep)).unwrap();
        gc.alloc(8, None).unwrap();

        let diagnostics = gc.diagnostics();
        assert_eq!(diagnostics["mode"], "mark-sweep");
        assert_eq!(diagnostics["state"], "Idle");
        assert_eq!(diagnostics["partition_count"], "1");
        assert_eq!(diagnostics["root_slots_used"], "0/16");
    }
}
