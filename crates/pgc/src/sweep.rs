//! Sweep - In-place reclamation back end
//!
//! After marking, every partition is walked in age order and its blocks in
//! address order. Reachable blocks get their mark cleared. Runs of dead
//! and previously-freed blocks are coalesced into single free blocks and
//! linked into the heap's size-classed free lists; a run that reaches the
//! partition's allocation top is reclaimed by pulling the top back
//! instead, so the tail returns to plain bump space. The free lists are
//! rebuilt from scratch on every sweep, which is what lets surviving free
//! blocks simply re-enter them.
//!
//! Finalizers of newly dead blocks run in address order within each
//! partition, partitions oldest first, before the block's bytes are
//! absorbed into a free run.

use crate::heap::Heap;
use crate::logging::{GcEvent, GcLogger};
use crate::object::header::{
    BlockHeader, GC_WORD_CLEAR, GC_WORD_FREE, GC_WORD_MARKED, HEADER_SIZE,
};
use crate::stats::GcStats;

/// Sweep every partition, rebuilding the free lists
pub fn sweep(heap: &mut Heap, logger: &mut GcLogger, stats: &mut GcStats) {
    heap.clear_free_lists();

    for index in 0..heap.partitions().len() {
        sweep_partition(heap, index, logger, stats);
    }

    // Return to the oldest partition so reclaimed tails are reused before
    // the chain grows again.
    if heap.partition_count() > 0 {
        heap.set_active(0);
    }
}

fn sweep_partition(heap: &mut Heap, index: usize, logger: &mut GcLogger, stats: &mut GcStats) {
    let base = heap.partitions()[index].base();
    let top = heap.partitions()[index].top();

    let mut cursor = 0usize;
    let mut run_start: Option<usize> = None;
    let mut free_runs: Vec<(usize, usize)> = Vec::new();

    while cursor < top {
        let header = (base + cursor) as *mut BlockHeader;
        let footprint = unsafe { (*header).footprint() };
        let gc_word = unsafe { (*header).gc_word };

        if gc_word == GC_WORD_MARKED {
            if let Some(start) = run_start.take() {
                free_runs.push((start, cursor));
            }
            unsafe { (*header).gc_word = GC_WORD_CLEAR };
        } else {
            if gc_word != GC_WORD_FREE {
                debug_assert_eq!(gc_word, GC_WORD_CLEAR);
                finalize_block(header, logger, stats);
                stats.record_reclaim(footprint);
            }
            if run_start.is_none() {
                run_start = Some(cursor);
            }
        }

        cursor += footprint;
    }

    if let Some(start) = run_start {
        // Trailing run: hand the bytes back to the bump allocator.
        heap.partitions_mut()[index].set_top(start);
    }

    for (start, end) in free_runs {
        let header = (base + start) as *mut BlockHeader;
        unsafe {
            (*header).size = (end - start) - HEADER_SIZE;
            (*header).gc_word = GC_WORD_FREE;
            (*header).descriptor = None;
        }
        heap.push_free(header);
    }
}

fn finalize_block(header: *mut BlockHeader, logger: &mut GcLogger, stats: &mut GcStats) {
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
}
