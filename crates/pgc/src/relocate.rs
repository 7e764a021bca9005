//! Relocate - Sliding compaction back end
//!
//! Compaction runs in three passes after marking, each a linear walk over
//! the partitions in age order:
//!
//! 1. **Plan** - a compaction cursor bump-allocates destinations for every
//!    reachable block, starting at the oldest partition's base. The
//!    destination header address is recorded in the block's own GC word
//!    (a real address is nonzero, so "has a forwarding pointer" and
//!    "reachable" stay one and the same). Because sources and destinations
//!    are visited in the same age-then-address order and live bytes never
//!    outgrow total bytes, a destination never lies past its source.
//! 2. **Rewrite** - every root slot and every reference slot inside live
//!    payloads is updated to the forwarded payload address. This must
//!    finish before any byte moves; afterwards the old addresses exist
//!    only in the blocks themselves.
//! 3. **Slide** - live blocks are copied to their destinations with an
//!    overlap-tolerant move, dead blocks are finalized in place, and each
//!    partition's allocation top drops to the planned compaction cursor.
//!
//! The collector then resumes allocating in the partition where the cursor
//! stopped; later partitions stay mapped and empty, ready for reuse.

use crate::heap::Heap;
use crate::logging::{GcEvent, GcLogger};
use crate::memory::copy_memory_overlapping;
use crate::object::header::{
    header_of, BlockHeader, GC_WORD_CLEAR, GC_WORD_MARKED, HEADER_SIZE,
};
use crate::roots::RootTable;
use crate::stats::GcStats;

/// Assign a destination to every reachable block
///
/// Stores each destination header address in the source block's GC word
/// and records the planned allocation top in every partition's compaction
/// scratch. Returns the index of the partition where the cursor stopped,
/// which becomes the active partition after the slide.
pub fn plan(heap: &mut Heap) -> usize {
    let count = heap.partitions().len();
    if count == 0 {
        return 0;
    }

    for partition in heap.partitions_mut() {
        partition.set_compact_top(0);
    }

    let mut dest_index = 0usize;
    let mut dest_offset = 0usize;

    for source in 0..count {
        for header in heap.partitions()[source].blocks() {
            if unsafe { (*header).gc_word } != GC_WORD_MARKED {
                continue;
            }
            let footprint = unsafe { (*header).footprint() };

            if dest_offset + footprint > heap.partitions()[dest_index].capacity() {
                heap.partitions_mut()[dest_index].set_compact_top(dest_offset);
                dest_index += 1;
                dest_offset = 0;
                // The block fit in its source partition, so it fits in an
                // empty one of the same geometry; and packed destinations
                // can never outrun their sources.
                debug_assert!(dest_index <= source);
                debug_assert!(footprint <= heap.partitions()[dest_index].capacity());
            }

            let dest = heap.partitions()[dest_index].base() + dest_offset;
            unsafe { (*header).gc_word = dest };
            dest_offset += footprint;
        }
    }

    heap.partitions_mut()[dest_index].set_compact_top(dest_offset);
    dest_index
}

/// Update every non-null root slot to its forwarded payload address
pub fn rewrite_roots(roots: &RootTable, logger: &mut GcLogger) {
    for slot in roots.slots() {
        if !slot.get().is_null() {
            unsafe { rewrite_slot(slot.as_ptr(), logger) };
        }
    }
}

/// Update every reference slot inside live payloads
///
/// Runs each live block's trace callback with the rewrite operation. Must
/// complete before the slide: once blocks move, stale source bytes may be
/// overwritten.
pub fn rewrite_heap(heap: &Heap, logger: &mut GcLogger) {
    for partition in heap.partitions() {
        for header in partition.blocks() {
            if unsafe { (*header).gc_word } == GC_WORD_CLEAR {
                continue;
            }
            let trace = unsafe { (*header).descriptor }.and_then(|d| d.trace);
            if let Some(trace) = trace {
                let payload = unsafe { (*header).payload() };
                let mut op = |slot: *mut *mut u8| unsafe {
                    rewrite_slot(slot, logger);
                };
                trace(payload, &mut op);
            }
        }
    }
}

/// Rewrite one reference slot through its child's forwarding pointer
///
/// # Safety
/// `slot` must be a valid reference slot holding null or a pointer to a
/// live payload whose block has a forwarding pointer planned.
unsafe fn rewrite_slot(slot: *mut *mut u8, logger: &mut GcLogger) {
    let child = *slot;
    if child.is_null() {
        return;
    }

    let header = header_of(child);
    let forward = (*header).forwarding();
    debug_assert!(!forward.is_null(), "reference into an unmarked block");

    // The destination header is not written yet; compute the payload
    // address arithmetically.
    let new = (forward as usize + HEADER_SIZE) as *mut u8;
    logger.emit(GcEvent::ReferenceUpdated {
        slot: slot as usize,
        old: child as usize,
        new: new as usize,
    });
    *slot = new;
}

/// Slide live blocks into place and finalize the dead
///
/// Walks blocks in age-then-address order: dead blocks run their
/// finalizer where they lie (their own reference slots are already stale,
/// which is why finalizers must treat payloads as opaque bytes); live
/// blocks move to their planned destination and get a clear GC word.
/// Afterwards each partition's top becomes its planned compaction top.
pub fn relocate(heap: &mut Heap, logger: &mut GcLogger, stats: &mut GcStats) {
    let count = heap.partitions().len();

    for source in 0..count {
        for header in heap.partitions()[source].blocks() {
            // Read the header before this block's own move can clobber it.
            let gc_word = unsafe { (*header).gc_word };
            let footprint = unsafe { (*header).footprint() };

            if gc_word == GC_WORD_CLEAR {
                unsafe {
                    if let Some(finalize) = (*header).descriptor.and_then(|d| d.finalize) {
                        let payload = (*header).payload();
                        finalize(payload);
                        stats.record_finalize();
                        logger.emit(GcEvent::BlockFinalized {
                            addr: payload as usize,
                        });
                    }
                }
                stats.record_reclaim(footprint);
                continue;
            }

            let dest = gc_word as *mut BlockHeader;
            if dest != header {
                unsafe {
                    copy_memory_overlapping(header as usize, dest as usize, footprint);
                }
                logger.emit(GcEvent::BlockRelocated {
                    src: header as usize + HEADER_SIZE,
                    dst: dest as usize + HEADER_SIZE,
                });
                stats.record_relocate(footprint);
            }
            unsafe { (*dest).gc_word = GC_WORD_CLEAR };
        }
    }

    for partition in heap.partitions_mut() {
        let planned = partition.compact_top();
        partition.set_top(planned);
    }
}
