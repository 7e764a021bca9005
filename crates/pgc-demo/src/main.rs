//! Demo driver: exercises allocation, rooting, reference rewriting, and
//! repeated collection with the diagnostic event stream enabled.

use pgc::{GarbageCollector, GcConfig, ObjectDescriptor, TraceOp};

fn trace_single_ref(payload: *mut u8, op: TraceOp<'_>) {
    op(payload as *mut *mut u8);
}

/// Object whose first word references another managed object
static SINGLE_REF: ObjectDescriptor = ObjectDescriptor {
    trace: Some(trace_single_ref),
    finalize: None,
};

fn main() -> pgc::Result<()> {
    let config = GcConfig {
        trace: true,
        ..Default::default()
    };
    let mut gc = GarbageCollector::new(config)?;

    // A mix of large and small objects; the large ones force the
    // partition chain to grow.
    gc.alloc(800_000, None)?;
    gc.alloc(800_000, Some(&SINGLE_REF))?;
    gc.alloc(80_000, None)?;
    let keeper = gc.alloc(80_000, Some(&SINGLE_REF))?;
    let root = gc.alloc_reference(keeper)?;

    // Everything but the rooted object is garbage.
    gc.collect();

    // More churn, then hang a child off the survivor.
    gc.alloc(80_000, None)?;
    gc.alloc(80_000, Some(&SINGLE_REF))?;
    let child = gc.alloc(80_000, None)?;
    unsafe { *(root.get() as *mut *mut u8) = child };

    gc.collect();

    // Dropping the root abandons the survivor and its child.
    gc.free_reference(root);
    gc.collect();

    for (key, value) in gc.diagnostics() {
        println!("{:>20}: {}", key, value);
    }
    let stats = gc.stats();
    println!(
        "{} cycles, {} blocks allocated, {} reclaimed, {} relocated",
        stats.cycles, stats.blocks_allocated, stats.blocks_reclaimed, stats.blocks_relocated
    );

    Ok(())
}
