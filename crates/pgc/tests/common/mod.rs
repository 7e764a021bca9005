//! Shared fixtures for the collector integration tests
//!
//! Provides small-partition collector constructors plus a family of host
//! object shapes: leaf objects with no references, objects whose first
//! word references another object, and list nodes carrying a payload tag
//! next to their link.

#![allow(dead_code)]

use pgc::{
    GarbageCollector, GcConfig, GcMode, ObjectDescriptor, RecordingSink, TraceOp,
};

/// Partition size used by most tests; small enough that a handful of
/// blocks spans several partitions.
pub const SMALL_PARTITION: usize = 4096;

pub fn small_config(mode: GcMode) -> GcConfig {
    GcConfig {
        mode,
        partition_size: SMALL_PARTITION,
        ref_table_capacity: 64,
        trace: false,
    }
}

pub fn compact_gc() -> GarbageCollector {
    GarbageCollector::new(small_config(GcMode::MarkCompact)).expect("collector init failed")
}

pub fn sweep_gc() -> GarbageCollector {
    GarbageCollector::new(small_config(GcMode::MarkSweep)).expect("collector init failed")
}

/// Collector wired to a recording sink, for event-stream assertions
pub fn recorded_gc(mode: GcMode) -> (GarbageCollector, RecordingSink) {
    let sink = RecordingSink::new();
    let gc = GarbageCollector::with_sink(small_config(mode), Box::new(sink.clone()))
        .expect("collector init failed");
    (gc, sink)
}

// === Host object shapes ===

fn trace_single_ref(payload: *mut u8, op: TraceOp<'_>) {
    op(payload as *mut *mut u8);
}

fn trace_pair_ref(payload: *mut u8, op: TraceOp<'_>) {
    let first = payload as *mut *mut u8;
    op(first);
    op(unsafe { first.add(1) });
}

/// Object whose first word references another managed object
pub static SINGLE_REF: ObjectDescriptor = ObjectDescriptor {
    trace: Some(trace_single_ref),
    finalize: None,
};

/// Object whose first two words reference other managed objects
pub static PAIR_REF: ObjectDescriptor = ObjectDescriptor {
    trace: Some(trace_pair_ref),
    finalize: None,
};

/// List node: word 0 is the link, word 1 is an opaque tag
pub static LIST_NODE: ObjectDescriptor = ObjectDescriptor {
    trace: Some(trace_single_ref),
    finalize: None,
};

/// Payload size of a `LIST_NODE`: link word plus tag word
pub const LIST_NODE_SIZE: usize = 2 * std::mem::size_of::<usize>();

// === Raw payload accessors ===

/// Store `child` into reference slot `index` of `parent`'s payload
pub unsafe fn set_child(parent: *mut u8, index: usize, child: *mut u8) {
    (parent as *mut *mut u8).add(index).write(child);
}

/// Read reference slot `index` of `parent`'s payload
pub unsafe fn get_child(parent: *mut u8, index: usize) -> *mut u8 {
    (parent as *const *mut u8).add(index).read()
}

/// Store a word of plain data at word offset `index`
pub unsafe fn write_word(payload: *mut u8, index: usize, value: usize) {
    (payload as *mut usize).add(index).write(value);
}

/// Read a word of plain data at word offset `index`
pub unsafe fn read_word(payload: *mut u8, index: usize) -> usize {
    (payload as *const usize).add(index).read()
}

/// Fill a payload with a repeating byte pattern
pub unsafe fn fill_payload(payload: *mut u8, size: usize, pattern: u8) {
    std::ptr::write_bytes(payload, pattern, size);
}

/// Assert a payload still carries the expected byte pattern
pub unsafe fn assert_payload(payload: *mut u8, size: usize, pattern: u8) {
    let bytes = std::slice::from_raw_parts(payload, size);
    assert!(
        bytes.iter().all(|&b| b == pattern),
        "payload at {:#x} lost its {:#x} pattern",
        payload as usize,
        pattern
    );
}
