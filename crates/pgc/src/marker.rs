//! Marker - Worklist marking from the root set
//!
//! Marking starts at every non-null root slot and follows references
//! through the hosts' trace callbacks. Instead of recursing through the
//! callbacks (deep object graphs would exhaust the stack), the marker
//! keeps an explicit worklist of payload addresses: the operation handed
//! to a trace callback marks the child and enqueues it, and the drain loop
//! invokes each dequeued object's own callback in turn. The mark flag in
//! the block header keeps cycles from being enqueued twice.

use std::collections::VecDeque;

use crate::logging::{GcEvent, GcLogger};
use crate::object::header::{header_of, GC_WORD_CLEAR, GC_WORD_MARKED};
use crate::roots::RootTable;

/// Worklist marker shared by both collection strategies
pub struct Marker {
    queue: VecDeque<usize>,
    marked: u64,
}

impl Marker {
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
            marked: 0,
        }
    }

    /// Objects marked by the most recent `mark_from_roots`
    pub fn marked_count(&self) -> u64 {
        self.marked
    }

    /// Mark everything reachable from the root table
    ///
    /// On return every reachable block has `gc_word == GC_WORD_MARKED` and
    /// every unreachable block still has `gc_word == GC_WORD_CLEAR`
    /// (sweep-mode free blocks keep their free tag; they are never
    /// reachable).
    pub fn mark_from_roots(&mut self, roots: &RootTable, logger: &mut GcLogger) -> u64 {
        self.queue.clear();
        self.marked = 0;

        let Self { queue, marked } = self;

        for slot in roots.slots() {
            if !slot.get().is_null() {
                // Cell<*mut u8> is layout-compatible with *mut u8, so the
                // slot address doubles as a reference-slot address.
                unsafe { mark_slot(slot.as_ptr(), queue, marked, logger) };
            }
        }

        while let Some(payload) = queue.pop_front() {
            let header = unsafe { header_of(payload as *mut u8) };
            let trace = unsafe { (*header).descriptor }.and_then(|d| d.trace);
            if let Some(trace) = trace {
                let mut op = |slot: *mut *mut u8| unsafe {
                    mark_slot(slot, queue, marked, logger);
                };
                trace(payload as *mut u8, &mut op);
            }
        }

        self.marked
    }
}

impl Default for Marker {
    fn default() -> Self {
        Self::new()
    }
}

/// Mark the child a reference slot points at and enqueue it
///
/// # Safety
/// `slot` must be a valid reference slot: it holds null or a pointer to
/// the first byte of a live managed payload.
unsafe fn mark_slot(
    slot: *mut *mut u8,
    queue: &mut VecDeque<usize>,
    marked: &mut u64,
    logger: &mut GcLogger,
) {
    let child = *slot;
    if child.is_null() {
        return;
    }

    let header = header_of(child);
    if (*header).gc_word != GC_WORD_CLEAR {
        // Already marked (or queued); this is what terminates cycles.
        return;
    }

    (*header).gc_word = GC_WORD_MARKED;
    *marked += 1;
    logger.emit(GcEvent::BlockMarked {
        addr: child as usize,
        size: (*header).size,
    });
    queue.push_back(child as usize);
}
