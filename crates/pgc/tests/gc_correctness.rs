//! End-to-end compaction scenarios: retention, reference rewriting,
//! finalization, cross-partition sliding, and cycle safety.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};

use common::*;
use pgc::object::HEADER_SIZE;
use pgc::{GcEvent, GcMode, ObjectDescriptor};

const WORD: usize = std::mem::size_of::<usize>();

#[test]
fn unrooted_heap_empties_completely() {
    let mut gc = compact_gc();
    gc.alloc(8, None).unwrap();
    gc.alloc(8, None).unwrap();
    gc.alloc(8, None).unwrap();

    gc.collect();

    assert_eq!(gc.stats().blocks_reclaimed, 3);
    assert_eq!(gc.heap().partitions()[gc.heap().active()].top(), 0);
    assert_eq!(gc.heap().used_bytes(), 0);
    gc.heap().verify();
}

#[test]
fn rooted_object_slides_to_the_heap_base() {
    let mut gc = compact_gc();
    gc.alloc(8, None).unwrap();
    gc.alloc(8, Some(&SINGLE_REF)).unwrap();
    gc.alloc(8, None).unwrap();
    let d = gc.alloc(8, Some(&SINGLE_REF)).unwrap();
    let root = gc.alloc_reference(d).unwrap();

    gc.collect();

    assert_eq!(gc.stats().blocks_reclaimed, 3);
    let survivor = root.get();
    assert_eq!(
        survivor as usize,
        gc.heap().partitions()[0].base() + HEADER_SIZE,
        "sole survivor must land at the first block offset of the oldest partition"
    );
    assert_eq!(gc.heap().used_bytes(), HEADER_SIZE + 8);
    gc.heap().verify();
}

#[test]
fn child_references_are_rewritten_through_the_tracer() {
    let mut gc = compact_gc();

    // Survivor D, then garbage E and F, then D's new child G.
    let d = gc.alloc(8, Some(&SINGLE_REF)).unwrap();
    let root = gc.alloc_reference(d).unwrap();
    gc.collect();

    gc.alloc(8, None).unwrap();
    gc.alloc(8, Some(&SINGLE_REF)).unwrap();
    let g = gc.alloc(8, None).unwrap();
    unsafe { set_child(root.get(), 0, g) };

    gc.collect();

    let d_new = root.get();
    assert_eq!(
        d_new as usize,
        gc.heap().partitions()[0].base() + HEADER_SIZE
    );

    // D and G are packed back to back; D's child slot follows the move.
    let g_new = unsafe { get_child(d_new, 0) };
    assert_eq!(g_new as usize, d_new as usize + 8 + HEADER_SIZE);
    assert_eq!(gc.heap().used_bytes(), 2 * (HEADER_SIZE + 8));
    gc.heap().verify();
}

#[test]
fn releasing_the_root_finalizes_exactly_once() {
    static FINALIZED: AtomicUsize = AtomicUsize::new(0);
    fn count_finalize(_payload: *mut u8) {
        FINALIZED.fetch_add(1, Ordering::SeqCst);
    }
    fn trace_first_word(payload: *mut u8, op: pgc::TraceOp<'_>) {
        op(payload as *mut *mut u8);
    }
    static TRACKED: ObjectDescriptor = ObjectDescriptor {
        trace: Some(trace_first_word),
        finalize: Some(count_finalize),
    };

    let mut gc = compact_gc();
    let d = gc.alloc(8, Some(&TRACKED)).unwrap();
    let root = gc.alloc_reference(d).unwrap();
    let g = gc.alloc(8, None).unwrap();
    unsafe { set_child(d, 0, g) };

    // While rooted, the finalizer never runs.
    gc.collect();
    gc.collect();
    assert_eq!(FINALIZED.load(Ordering::SeqCst), 0);

    gc.free_reference(root);
    gc.collect();

    assert_eq!(FINALIZED.load(Ordering::SeqCst), 1);
    assert_eq!(gc.heap().used_bytes(), 0);

    // A further cycle must not finalize the object again.
    gc.collect();
    assert_eq!(FINALIZED.load(Ordering::SeqCst), 1);
}

#[test]
fn survivors_pack_across_partitions() {
    let mut gc = compact_gc();

    // Six blocks, one per partition; root every other one.
    let mut roots = Vec::new();
    for index in 0..6u8 {
        let payload = gc.alloc(3000, None).unwrap();
        unsafe { fill_payload(payload, 3000, index + 1) };
        if index % 2 == 1 {
            roots.push((gc.alloc_reference(payload).unwrap(), index + 1));
        }
    }
    assert_eq!(gc.heap().partition_count(), 6);

    gc.collect();

    // Three survivors pack into partitions 0..3, in their original order.
    for (slot, (root, pattern)) in roots.iter().enumerate() {
        let payload = root.get();
        let partition = &gc.heap().partitions()[slot];
        assert_eq!(payload as usize, partition.base() + HEADER_SIZE);
        unsafe { assert_payload(payload, 3000, *pattern) };
    }

    assert_eq!(gc.heap().active(), 2);
    for partition in &gc.heap().partitions()[3..] {
        assert!(partition.is_empty());
    }
    assert_eq!(gc.heap().partition_count(), 6);
    gc.heap().verify();
}

#[test]
fn reference_cycles_survive_and_marking_terminates() {
    let mut gc = compact_gc();

    let x = gc.alloc(8, Some(&SINGLE_REF)).unwrap();
    let y = gc.alloc(8, Some(&SINGLE_REF)).unwrap();
    unsafe {
        set_child(x, 0, y);
        set_child(y, 0, x);
    }
    let root = gc.alloc_reference(x).unwrap();

    gc.collect();

    let x_new = root.get();
    let y_new = unsafe { get_child(x_new, 0) };
    assert_eq!(unsafe { get_child(y_new, 0) }, x_new);
    assert_eq!(gc.stats().blocks_reclaimed, 0);
    assert_eq!(gc.heap().used_bytes(), 2 * (HEADER_SIZE + 8));

    // An unrooted cycle is garbage despite referencing itself.
    gc.free_reference(root);
    gc.collect();
    assert_eq!(gc.stats().blocks_reclaimed, 2);
    assert_eq!(gc.heap().used_bytes(), 0);
}

#[test]
fn quiescent_collections_are_idempotent() {
    let mut gc = compact_gc();

    let a = gc.alloc(16, Some(&SINGLE_REF)).unwrap();
    let b = gc.alloc(WORD, None).unwrap();
    unsafe { set_child(a, 0, b) };
    let root = gc.alloc_reference(a).unwrap();
    gc.alloc(64, None).unwrap();

    gc.collect();
    let first_addr = root.get();
    let first_tops: Vec<usize> = gc.heap().partitions().iter().map(|p| p.top()).collect();

    gc.collect();
    let second_tops: Vec<usize> = gc.heap().partitions().iter().map(|p| p.top()).collect();

    assert_eq!(root.get(), first_addr);
    assert_eq!(first_tops, second_tops);
    assert_eq!(unsafe { get_child(root.get(), 0) } as usize,
               first_addr as usize + 16 + HEADER_SIZE);
}

#[test]
fn relocation_emits_move_and_rewrite_events() {
    let (mut gc, sink) = recorded_gc(GcMode::MarkCompact);

    gc.alloc(64, None).unwrap();
    let payload = gc.alloc(8, None).unwrap();
    let root = gc.alloc_reference(payload).unwrap();
    sink.clear();

    gc.collect();

    let events = sink.events();
    let moved = events
        .iter()
        .any(|e| matches!(e, GcEvent::BlockRelocated { src, .. } if *src == payload as usize));
    assert!(moved, "survivor move must be reported");

    let rewritten = events.iter().any(|e| {
        matches!(e, GcEvent::ReferenceUpdated { slot, old, new }
            if *slot == root.slot_addr()
                && *old == payload as usize
                && *new == root.get() as usize)
    });
    assert!(rewritten, "root rewrite must be reported");

    assert!(events
        .iter()
        .any(|e| matches!(e, GcEvent::CycleEnd { live_blocks: 1, .. })));
}
